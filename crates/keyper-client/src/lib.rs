// ABOUTME: Client library for the Keyper SSH key management server.
// ABOUTME: Exposes the server API trait, its HTTP implementation and key bookkeeping helpers.

pub mod api;
pub mod config;
pub mod error;
pub mod keys;
pub mod models;

pub use api::{HttpKeyperClient, KeyperApi};
pub use config::ServerConfig;
pub use error::{ClientError, Result};
pub use keys::{add_key, delete_key, list_keys, revoke_key};
pub use models::{parse_expiry, HostGroup, HostGroupEntry, RemoteKeyRecord, UserRecord};
