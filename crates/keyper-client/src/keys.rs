// ABOUTME: Key bookkeeping on top of the server API.
// ABOUTME: Listing with locality and expiry, revoke, add and delete-by-id.

use crate::api::KeyperApi;
use crate::error::{ClientError, Result};
use crate::models::RemoteKeyRecord;

/// Fetch a user's keys in server order.
///
/// Expiry stamps are parsed and `local` is set for records whose name
/// contains `host`.
pub async fn list_keys(
    api: &dyn KeyperApi,
    username: &str,
    host: &str,
) -> Result<Vec<RemoteKeyRecord>> {
    let user = api.get_user(username).await?;

    let mut keys = user.ssh_public_keys;
    for key in &mut keys {
        key.resolve_expiry()?;
        key.local = !host.is_empty() && key.name.contains(host);
    }

    tracing::debug!(username, count = keys.len(), "listed keys");
    Ok(keys)
}

/// Revoke a key by submitting it with no host groups and no expiry.
pub async fn revoke_key(
    api: &dyn KeyperApi,
    username: &str,
    record: &RemoteKeyRecord,
) -> Result<()> {
    let mut revoked = record.clone();
    revoked.host_groups.clear();
    revoked.date_expire.clear();
    revoked.expires = None;

    tracing::info!(username, key_id = record.key_id, name = %record.name, "revoking key");
    api.put_user_keys(username, vec![revoked]).await
}

/// Register a key as a new entry. Any server id on the record is dropped.
pub async fn add_key(
    api: &dyn KeyperApi,
    username: &str,
    mut record: RemoteKeyRecord,
) -> Result<()> {
    record.key_id = 0;

    tracing::info!(username, name = %record.name, "adding key");
    api.put_user_keys(username, vec![record]).await
}

/// Revoke the key with `key_id`, returning the record that was revoked.
///
/// `announce` sees the matching record before it is revoked and is not
/// called when no key has that id.
pub async fn delete_key(
    api: &dyn KeyperApi,
    username: &str,
    host: &str,
    key_id: u64,
    announce: impl FnOnce(&RemoteKeyRecord) + Send,
) -> Result<RemoteKeyRecord> {
    let keys = list_keys(api, username, host).await?;

    let record = keys
        .into_iter()
        .find(|k| k.key_id == key_id)
        .ok_or(ClientError::KeyNotFound(key_id))?;

    announce(&record);
    revoke_key(api, username, &record).await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostGroup, UserRecord};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        user: UserRecord,
        puts: Mutex<Vec<Vec<RemoteKeyRecord>>>,
    }

    #[async_trait]
    impl KeyperApi for FakeApi {
        async fn get_user(&self, _username: &str) -> Result<UserRecord> {
            Ok(self.user.clone())
        }

        async fn put_user_keys(&self, _username: &str, keys: Vec<RemoteKeyRecord>) -> Result<()> {
            self.puts.lock().unwrap().push(keys);
            Ok(())
        }
    }

    fn record(id: u64, name: &str) -> RemoteKeyRecord {
        RemoteKeyRecord {
            key_id: id,
            name: name.into(),
            date_expire: "20301231235959".into(),
            host_groups: vec![HostGroup::new("cn=web,ou=groups,dc=example,dc=org")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_revoke_clears_groups_and_expiry() {
        let api = FakeApi::default();
        revoke_key(&api, "alice", &record(4, "alice@laptop")).await.unwrap();

        let puts = api.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        let sent = &puts[0][0];
        assert_eq!(sent.key_id, 4);
        assert!(sent.host_groups.is_empty());
        assert!(sent.date_expire.is_empty());
    }

    #[tokio::test]
    async fn test_add_resets_id() {
        let api = FakeApi::default();
        add_key(&api, "alice", record(4, "alice@laptop")).await.unwrap();

        let puts = api.puts.lock().unwrap();
        assert_eq!(puts[0][0].key_id, 0);
        assert_eq!(puts[0][0].host_groups.len(), 1);
    }

    #[tokio::test]
    async fn test_list_rejects_malformed_expiry() {
        let mut bad = record(1, "alice@laptop");
        bad.date_expire = "2020120415300".into();
        let api = FakeApi {
            user: UserRecord::with_keys(vec![bad]),
            ..Default::default()
        };

        let result = list_keys(&api, "alice", "laptop").await;
        assert!(matches!(result, Err(ClientError::Expiry { .. })));
    }

    #[tokio::test]
    async fn test_empty_host_marks_nothing_local() {
        let api = FakeApi {
            user: UserRecord::with_keys(vec![record(1, "alice@laptop")]),
            ..Default::default()
        };

        let keys = list_keys(&api, "alice", "").await.unwrap();
        assert!(!keys[0].local);
    }
}
