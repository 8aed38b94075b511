// ABOUTME: Reconciles a freshly generated key with the keys a user already has on the server.
// ABOUTME: Replaces a same-named key via revoke then add, or adds a new key with host groups.

use std::fmt;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyper_client::{add_key, list_keys, revoke_key, HostGroup, KeyperApi, RemoteKeyRecord};
use keyper_ssh::GeneratedKey;

use crate::prompt::Prompter;

/// Which branch reconciliation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Added,
    Replaced,
}

/// Result of [`Reconciler::reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub outcome: Outcome,
    /// The record as submitted to the server.
    pub record: RemoteKeyRecord,
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Added => write!(f, "New key with name {} added to keyper", self.record.name),
            Outcome::Replaced => write!(
                f,
                "Replaced existing key with name {} in keyper",
                self.record.name
            ),
        }
    }
}

pub struct Reconciler<'a> {
    api: &'a dyn KeyperApi,
    prompter: &'a dyn Prompter,
    host: &'a str,
    notices: Mutex<Vec<String>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn KeyperApi, prompter: &'a dyn Prompter, host: &'a str) -> Self {
        Self {
            api,
            prompter,
            host,
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Progress lines printed so far, in order.
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    fn notify(&self, message: String) {
        println!("{message}");
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(message);
        }
    }

    /// Register `key` under `name` for `username`.
    ///
    /// A server key with the same name is revoked first and its host groups
    /// carry over to the replacement. The replacement is always submitted as
    /// a new entry, so the server assigns it a fresh id.
    pub async fn reconcile(
        &self,
        username: &str,
        name: &str,
        key: &GeneratedKey,
    ) -> Result<Reconciliation> {
        let existing = list_keys(self.api, username, self.host)
            .await
            .with_context(|| format!("failed to list keys for {username}"))?;

        let (mut record, outcome) = match existing.into_iter().find(|k| k.name == name) {
            Some(found) => {
                self.notify(format!("Found existing key with name {name}"));
                revoke_key(self.api, username, &found)
                    .await
                    .with_context(|| format!("failed to revoke key {}", found.key_id))?;
                self.notify(format!("Revoked existing key with name {name}"));
                (found, Outcome::Replaced)
            }
            None => (RemoteKeyRecord::default(), Outcome::Added),
        };
        tracing::info!(name, ?outcome, "reconciling key");

        if record.host_groups.is_empty() {
            record.host_groups = self.choose_host_groups(username).await?;
        }

        record.name = name.to_string();
        record.key = key.authorized_key.clone();
        record.fingerprint = key.fingerprint.clone();
        record.date_expire.clear();
        record.expires = None;
        record.key_id = 0;
        record.local = !self.host.is_empty() && name.contains(self.host);

        add_key(self.api, username, record.clone())
            .await
            .with_context(|| format!("failed to add key {name}"))?;

        Ok(Reconciliation { outcome, record })
    }

    /// Let the user pick host groups one at a time from their memberships.
    /// Declining straight away leaves the key with no host groups.
    async fn choose_host_groups(&self, username: &str) -> Result<Vec<HostGroup>> {
        let user = self
            .api
            .get_user(username)
            .await
            .with_context(|| format!("failed to fetch host groups for {username}"))?;

        let mut available = user.groups;
        if available.is_empty() {
            tracing::warn!(username, "user has no host groups to assign");
            return Ok(Vec::new());
        }

        available.sort_by_key(HostGroup::cn);

        let mut chosen = Vec::new();
        let mut question = "Add a host group to this key?";
        while !available.is_empty() && self.prompter.confirm(question, true)? {
            let labels: Vec<String> = available.iter().map(HostGroup::cn).collect();
            let index = self.prompter.select("Select a host group", &labels)?;
            if index >= available.len() {
                anyhow::bail!("invalid host group selection {index}");
            }
            chosen.push(available.remove(index));
            question = "Add another host group?";
        }

        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::scripted::{Answer, Scripted};
    use async_trait::async_trait;
    use keyper_client::UserRecord;

    struct Server {
        user: UserRecord,
        puts: Mutex<Vec<RemoteKeyRecord>>,
    }

    #[async_trait]
    impl KeyperApi for Server {
        async fn get_user(&self, _username: &str) -> keyper_client::Result<UserRecord> {
            Ok(self.user.clone())
        }

        async fn put_user_keys(
            &self,
            _username: &str,
            keys: Vec<RemoteKeyRecord>,
        ) -> keyper_client::Result<()> {
            self.puts.lock().unwrap().extend(keys);
            Ok(())
        }
    }

    fn groups() -> Vec<HostGroup> {
        vec![
            HostGroup::new("cn=web,ou=groups,dc=example,dc=org"),
            HostGroup::new("cn=db,ou=groups,dc=example,dc=org"),
            HostGroup::new("cn=ci,ou=groups,dc=example,dc=org"),
        ]
    }

    fn generated() -> GeneratedKey {
        GeneratedKey {
            authorized_key: "ssh-ed25519 AAAAnew carol@desk".into(),
            fingerprint: "SHA256:new".into(),
            private_path: None,
            public_path: "/tmp/id_ed25519.pub".into(),
        }
    }

    #[tokio::test]
    async fn test_selects_groups_until_declined() {
        let server = Server {
            user: UserRecord {
                groups: groups(),
                ..Default::default()
            },
            puts: Mutex::new(Vec::new()),
        };
        let prompter = Scripted::new([
            Answer::Confirm(true),
            Answer::Select(1),
            Answer::Confirm(true),
            Answer::Select(1),
            Answer::Confirm(false),
        ]);

        let result = Reconciler::new(&server, &prompter, "desk")
            .reconcile("carol", "carol@desk", &generated())
            .await
            .unwrap();

        // Offered as [ci, db, web]; after "db" is taken the list is [ci, web].
        let names: Vec<String> = result.record.host_groups.iter().map(HostGroup::cn).collect();
        assert_eq!(names, vec!["db", "web"]);
        assert_eq!(
            prompter.offered.lock().unwrap().clone(),
            vec![vec!["ci", "db", "web"], vec!["ci", "web"]]
        );
        assert!(result.record.local);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn test_declining_leaves_no_groups() {
        let server = Server {
            user: UserRecord {
                groups: groups(),
                ..Default::default()
            },
            puts: Mutex::new(Vec::new()),
        };
        let prompter = Scripted::new([Answer::Confirm(false)]);

        let result = Reconciler::new(&server, &prompter, "desk")
            .reconcile("carol", "carol@desk", &generated())
            .await
            .unwrap();

        assert!(result.record.host_groups.is_empty());
        assert_eq!(server.puts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stops_when_groups_run_out() {
        let server = Server {
            user: UserRecord {
                groups: vec![HostGroup::new("cn=web,ou=groups,dc=example,dc=org")],
                ..Default::default()
            },
            puts: Mutex::new(Vec::new()),
        };
        let prompter = Scripted::new([Answer::Confirm(true), Answer::Select(0)]);

        let result = Reconciler::new(&server, &prompter, "desk")
            .reconcile("carol", "carol@desk", &generated())
            .await
            .unwrap();

        assert_eq!(result.record.host_groups.len(), 1);
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn test_replace_announces_found_and_revoked() {
        let server = Server {
            user: UserRecord::with_keys(vec![RemoteKeyRecord {
                key_id: 2,
                name: "carol@desk".into(),
                host_groups: groups(),
                ..Default::default()
            }]),
            puts: Mutex::new(Vec::new()),
        };
        let prompter = Scripted::new([]);
        let reconciler = Reconciler::new(&server, &prompter, "desk");

        reconciler
            .reconcile("carol", "carol@desk", &generated())
            .await
            .unwrap();

        assert_eq!(
            reconciler.notices(),
            vec![
                "Found existing key with name carol@desk",
                "Revoked existing key with name carol@desk",
            ]
        );
    }

    #[tokio::test]
    async fn test_fresh_add_has_no_notices() {
        let server = Server {
            user: UserRecord::default(),
            puts: Mutex::new(Vec::new()),
        };
        let prompter = Scripted::new([]);
        let reconciler = Reconciler::new(&server, &prompter, "desk");

        reconciler
            .reconcile("carol", "carol@desk", &generated())
            .await
            .unwrap();

        assert!(reconciler.notices().is_empty());
    }

    #[test]
    fn test_messages() {
        let record = RemoteKeyRecord {
            name: "carol@desk".into(),
            ..Default::default()
        };
        let added = Reconciliation {
            outcome: Outcome::Added,
            record: record.clone(),
        };
        let replaced = Reconciliation {
            outcome: Outcome::Replaced,
            record,
        };

        assert_eq!(added.to_string(), "New key with name carol@desk added to keyper");
        assert_eq!(
            replaced.to_string(),
            "Replaced existing key with name carol@desk in keyper"
        );
    }
}
