// ABOUTME: Implementation of 'keyper keys list'
// ABOUTME: Prints a user's keys, highlighting keys from this host and expired keys

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use colored::Colorize;
use keyper_client::{list_keys, RemoteKeyRecord};

use super::ServerArgs;
use crate::params::Environment;

pub async fn run(user: Option<String>, server: &ServerArgs, env: &Environment) -> Result<()> {
    let username = user.unwrap_or_else(|| env.login.clone());
    let api = server.connect().await?;

    let keys = list_keys(&api, &username, &env.hostname)
        .await
        .with_context(|| format!("failed to list keys for {username}"))?;

    if keys.is_empty() {
        println!("{}", format!("No keys registered for {username}").dimmed());
        return Ok(());
    }

    let now = chrono::Local::now().naive_local();
    for key in &keys {
        println!("{}", format_key(key, now));
    }
    Ok(())
}

/// `id: name - fingerprint - expiry`
pub fn format_key(key: &RemoteKeyRecord, now: NaiveDateTime) -> String {
    let name = if key.local {
        key.name.cyan().to_string()
    } else {
        key.name.clone()
    };

    let expiry = match key.expires {
        Some(at) => {
            let text = at.format("%Y-%m-%d %H:%M:%S").to_string();
            if key.is_expired(now) {
                text.red().to_string()
            } else {
                text
            }
        }
        None => "never".dimmed().to_string(),
    };

    format!("{}: {} - {} - {}", key.key_id, name, key.fingerprint, expiry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyper_client::parse_expiry;

    fn key(date: &str, local: bool) -> RemoteKeyRecord {
        let mut key = RemoteKeyRecord {
            key_id: 5,
            name: "alice@laptop".into(),
            fingerprint: "SHA256:abc".into(),
            date_expire: date.into(),
            local,
            ..Default::default()
        };
        key.resolve_expiry().unwrap();
        key
    }

    #[test]
    fn test_format_plain() {
        colored::control::set_override(false);
        let now = parse_expiry("20200101000000").unwrap();

        assert_eq!(
            format_key(&key("20201204153000", true), now),
            "5: alice@laptop - SHA256:abc - 2020-12-04 15:30:00"
        );
        assert_eq!(
            format_key(&key("", false), now),
            "5: alice@laptop - SHA256:abc - never"
        );
    }
}
