// ABOUTME: Wire models exchanged with the Keyper server.
// ABOUTME: User and key records, host group distinguished names and expiry parsing.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClientError, Result};

/// A user as returned by `GET /api/users/{username}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "is_false")]
    pub account_locked: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dn: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub given_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mail: String,
    #[serde(rename = "memberOfs", default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<HostGroup>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sn: String,
    #[serde(rename = "sshPublicKeys", default)]
    pub ssh_public_keys: Vec<RemoteKeyRecord>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

impl UserRecord {
    /// Body of a `PUT /api/users/{username}` carrying only key changes.
    pub fn with_keys(keys: Vec<RemoteKeyRecord>) -> Self {
        Self {
            ssh_public_keys: keys,
            ..Self::default()
        }
    }
}

/// A public key registered for a user.
///
/// The logical `name` (conventionally `user@host`) identifies a key across
/// regenerations; `key_id` is assigned by the server and 0 means "new".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteKeyRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cn: String,
    #[serde(rename = "dateExpire", default, skip_serializing_if = "String::is_empty")]
    pub date_expire: String,
    #[serde(rename = "hostGroups", default, skip_serializing_if = "Vec::is_empty")]
    pub host_groups: Vec<HostGroup>,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "keyid", default, skip_serializing_if = "is_zero")]
    pub key_id: u64,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "keyType", default, skip_serializing_if = "is_zero")]
    pub key_type: u64,
    /// Parsed `date_expire`, filled in by listing.
    #[serde(skip)]
    pub expires: Option<NaiveDateTime>,
    /// True when `name` mentions the host the listing was made for.
    #[serde(skip)]
    pub local: bool,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Parse a server expiry stamp `YYYYMMDDhhmmss`.
///
/// The value is read positionally and carries no timezone.
pub fn parse_expiry(value: &str) -> Result<NaiveDateTime> {
    let invalid = || ClientError::Expiry {
        value: value.to_string(),
    };

    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32> {
        value[range].parse::<u32>().map_err(|_| invalid())
    };

    let year = i32::try_from(field(0..4)?).map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)
        .and_then(|d| d.and_hms_opt(field(8..10).ok()?, field(10..12).ok()?, field(12..14).ok()?))
        .ok_or_else(invalid)
}

impl RemoteKeyRecord {
    /// Parse `date_expire` into `expires`. An empty stamp means no expiry.
    pub fn resolve_expiry(&mut self) -> Result<()> {
        self.expires = if self.date_expire.is_empty() {
            None
        } else {
            Some(parse_expiry(&self.date_expire)?)
        };
        Ok(())
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// A host group in its single-string distinguished name form,
/// e.g. `cn=demo_servers,ou=groups,dc=keyper,dc=example,dc=org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostGroup(pub String);

/// Structured fields of a [`HostGroup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostGroupEntry {
    pub cn: String,
    pub ou: String,
    pub dc: Vec<String>,
}

impl HostGroup {
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the distinguished name into its fields. Unknown attributes are ignored.
    pub fn parse(&self) -> HostGroupEntry {
        let mut entry = HostGroupEntry::default();
        for part in self.0.split(',') {
            let part = part.trim();
            if let Some(cn) = part.strip_prefix("cn=") {
                entry.cn = cn.to_string();
            } else if let Some(ou) = part.strip_prefix("ou=") {
                entry.ou = ou.to_string();
            } else if let Some(dc) = part.strip_prefix("dc=") {
                entry.dc.push(dc.to_string());
            }
        }
        entry
    }

    /// Common name, the label shown when choosing groups.
    pub fn cn(&self) -> String {
        self.parse().cn
    }
}

impl fmt::Display for HostGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for HostGroupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cn={},ou={}", self.cn, self.ou)?;
        for dc in &self.dc {
            write!(f, ",dc={}", dc)?;
        }
        Ok(())
    }
}

impl From<HostGroupEntry> for HostGroup {
    fn from(entry: HostGroupEntry) -> Self {
        HostGroup(entry.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_USER: &str = r#"{
      "accountLocked": false,
      "cn": "alice",
      "displayName": "Alice Parker",
      "dn": "cn=alice,ou=people,dc=keyper,dc=example,dc=org",
      "givenName": "Alice",
      "mail": "alice@example.org",
      "memberOfs": [
        "cn=demo_servers,ou=groups,dc=keyper,dc=example,dc=org"
      ],
      "sn": "Parker",
      "sshPublicKeys": [
        {
          "dateExpire": "20201204153000",
          "hostGroups": [
            "cn=demo_servers,ou=groups,dc=keyper,dc=example,dc=org"
          ],
          "key": "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIO3mepiIGcR/X0pUqTHo4qI27NLDq/DXpX/C2m+nGcM9",
          "keyid": 12,
          "fingerprint": "SHA256:X0KiFE6EolWXQQYUQ/giYoU0YcJ1/rH7xQi3r8BYFO0",
          "name": "alice@laptop"
        }
      ],
      "uid": "alice"
    }"#;

    #[test]
    fn test_user_record_deserializes() {
        let user: UserRecord = serde_json::from_str(SAMPLE_USER).expect("valid user json");

        assert_eq!(user.uid, "alice");
        assert_eq!(user.groups.len(), 1);
        assert_eq!(user.groups[0].cn(), "demo_servers");
        assert_eq!(user.ssh_public_keys.len(), 1);

        let key = &user.ssh_public_keys[0];
        assert_eq!(key.key_id, 12);
        assert_eq!(key.name, "alice@laptop");
        assert_eq!(key.date_expire, "20201204153000");
        assert!(key.expires.is_none(), "expiry is resolved by listing");
        assert!(!key.local);
    }

    #[test]
    fn test_new_key_payload_omits_id_and_local_fields() {
        let record = RemoteKeyRecord {
            name: "bob@laptop".into(),
            key: "ssh-ed25519 AAAA bob@laptop".into(),
            fingerprint: "SHA256:abc".into(),
            local: true,
            ..Default::default()
        };
        let body = serde_json::to_value(UserRecord::with_keys(vec![record])).unwrap();

        let key = &body["sshPublicKeys"][0];
        assert_eq!(key["name"], "bob@laptop");
        assert!(key.get("keyid").is_none());
        assert!(key.get("local").is_none());
        assert!(key.get("dateExpire").is_none());
        assert!(key.get("hostGroups").is_none());
        assert!(body.get("memberOfs").is_none());
        assert!(body.get("uid").is_none());
    }

    #[test]
    fn test_parse_expiry_positional() {
        let at = parse_expiry("20201204153000").expect("valid stamp");
        assert_eq!(at.to_string(), "2020-12-04 15:30:00");
    }

    #[test]
    fn test_parse_expiry_rejects_malformed() {
        for bad in ["2020120415300", "202012041530000", "20201204", "2020-12-04T15:3", ""] {
            assert!(
                matches!(parse_expiry(bad), Err(ClientError::Expiry { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_expiry_rejects_impossible_dates() {
        assert!(parse_expiry("20201304153000").is_err());
        assert!(parse_expiry("20201204256000").is_err());
    }

    #[test]
    fn test_resolve_expiry_allows_missing_stamp() {
        let mut record = RemoteKeyRecord::default();
        record.resolve_expiry().expect("empty stamp is no expiry");
        assert!(record.expires.is_none());
        assert!(!record.is_expired(parse_expiry("20991231235959").unwrap()));
    }

    #[test]
    fn test_is_expired() {
        let mut record = RemoteKeyRecord {
            date_expire: "20201204153000".into(),
            ..Default::default()
        };
        record.resolve_expiry().unwrap();

        assert!(record.is_expired(parse_expiry("20201204153000").unwrap()));
        assert!(!record.is_expired(parse_expiry("20201204152959").unwrap()));
    }

    #[test]
    fn test_host_group_parse() {
        let group = HostGroup::new("cn=demo_servers,ou=groups,dc=keyper,dc=example,dc=org");
        let entry = group.parse();

        assert_eq!(entry.cn, "demo_servers");
        assert_eq!(entry.ou, "groups");
        assert_eq!(entry.dc, vec!["keyper", "example", "org"]);
    }

    #[test]
    fn test_host_group_round_trip() {
        let dn = "cn=demo_servers,ou=groups,dc=keyper,dc=example,dc=org";
        let group = HostGroup::new(dn);

        assert_eq!(HostGroup::from(group.parse()), group);
        assert_eq!(group.parse().to_string(), dn);
    }

    #[test]
    fn test_host_group_serializes_as_string() {
        let group = HostGroup::new("cn=a,ou=groups,dc=org");
        assert_eq!(
            serde_json::to_string(&group).unwrap(),
            "\"cn=a,ou=groups,dc=org\""
        );
    }
}
