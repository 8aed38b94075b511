// ABOUTME: Implementation of 'keyper keys delete'
// ABOUTME: Revokes one of a user's keys by its server id

use anyhow::{Context, Result};
use colored::Colorize;
use keyper_client::delete_key;

use super::ServerArgs;
use crate::params::Environment;

pub async fn run(
    key_id: u64,
    user: Option<String>,
    server: &ServerArgs,
    env: &Environment,
) -> Result<()> {
    let username = user.unwrap_or_else(|| env.login.clone());
    let api = server.connect().await?;

    let record = delete_key(&api, &username, &env.hostname, key_id, |found| {
        println!("deleting key {key_id}");
        match serde_json::to_string_pretty(found) {
            Ok(pretty) => println!("{pretty}"),
            Err(e) => tracing::warn!(error = %e, "could not render key record"),
        }
    })
    .await
    .with_context(|| format!("failed to delete key {key_id} for {username}"))?;

    println!("{}", format!("Revoked key {} ({})", key_id, record.name).green());
    Ok(())
}
