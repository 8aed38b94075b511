// ABOUTME: Error types for keyper-client.
// ABOUTME: Covers configuration, transport, HTTP status and payload failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read config from {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid server address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{method} request for {url} failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("problem with {method} request for {url} (status code: {status}): {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode {method} response from {url}: {source}")]
    Decode {
        method: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid expiry date {value:?}: expected 14 digits YYYYMMDDhhmmss")]
    Expiry { value: String },

    #[error("key ID {0} not found")]
    KeyNotFound(u64),
}

pub type Result<T> = std::result::Result<T, ClientError>;
