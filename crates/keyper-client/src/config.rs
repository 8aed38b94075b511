// ABOUTME: Connection settings for the Keyper server.
// ABOUTME: Merges flag/environment values with the optional TOML config file and validates them.

use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolved server connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// On-disk layout of `config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerSection {
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Values supplied on the command line or through `KEYPER_*` variables.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Get XDG-style config directory (~/.config/keyper).
///
/// Uses `XDG_CONFIG_HOME` if set, otherwise falls back to `~/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("keyper"))
}

/// Default config file path (~/.config/keyper/config.toml).
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

impl ConfigFile {
    /// Load the config file. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ClientError::ReadConfig {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        toml::from_str(&contents).map_err(|e| ClientError::ParseConfig {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl ServerConfig {
    /// Resolve settings (override > config file) and validate them.
    pub fn resolve(overrides: ConfigOverrides, file: ConfigFile) -> Result<Self> {
        let pick = |value: Option<String>, fallback: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .or(fallback)
                .unwrap_or_default()
        };

        let config = Self {
            address: pick(overrides.address, file.server.address)
                .trim()
                .trim_end_matches('/')
                .to_string(),
            username: pick(overrides.username, file.server.username),
            password: pick(overrides.password, file.server.password),
        };

        config.validate()?;
        Ok(config)
    }

    /// Resolve using the default config file location.
    pub fn load(overrides: ConfigOverrides, path: Option<&Path>) -> Result<Self> {
        let file = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => ConfigFile::load(&path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(overrides, file)
    }

    fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(ClientError::Config(
                "server address is required (set KEYPER_ADDRESS or --address)".into(),
            ));
        }
        if self.username.is_empty() {
            return Err(ClientError::Config(
                "server username is required (set KEYPER_USERNAME or --username)".into(),
            ));
        }
        if self.password.is_empty() {
            return Err(ClientError::Config(
                "server password is required (set KEYPER_PASSWORD or --password)".into(),
            ));
        }
        url::Url::parse(&self.address).map_err(|e| ClientError::Address {
            address: self.address.clone(),
            source: e,
        })?;
        Ok(())
    }
}
