// ABOUTME: CLI command definitions using clap
// ABOUTME: Defines global flags and the keys/version subcommands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use keyper_client::config::ConfigOverrides;
use keyper_client::{HttpKeyperClient, ServerConfig};
use keyper_log::Verbosity;

pub mod delete;
pub mod list;
pub mod new;
pub mod version;

#[derive(Parser, Debug)]
#[command(
    name = "keyper",
    version,
    about = "Generate SSH keys and manage them on a Keyper server"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less output (repeat for less)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(long, hide = true, global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::new(self.verbose, self.quiet, self.debug)
    }
}

/// Connection settings, falling back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Keyper server address (e.g., https://keyper.example.org)
    #[arg(long, global = true, env = "KEYPER_ADDRESS")]
    pub address: Option<String>,

    /// Username to authenticate with
    #[arg(long, global = true, env = "KEYPER_USERNAME")]
    pub username: Option<String>,

    /// Password to authenticate with
    #[arg(long, global = true, env = "KEYPER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Config file (default: ~/.config/keyper/config.toml)
    #[arg(long, global = true, env = "KEYPER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ServerArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            address: self.address.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    /// Resolve settings and log in.
    pub async fn connect(&self) -> Result<HttpKeyperClient> {
        let config = ServerConfig::load(self.overrides(), self.config.as_deref())?;
        HttpKeyperClient::connect(&config)
            .await
            .with_context(|| format!("failed to log in to {}", config.address))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage SSH keys
    #[command(subcommand)]
    Keys(KeysCommand),

    /// Show the version of keyper
    Version {
        /// Check whether a newer release is available
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Generate a new key and register it with the server
    New(NewArgs),

    /// List the keys registered for a user
    List {
        /// User whose keys to list (default: current login)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Revoke a key by id
    Delete {
        /// Server id of the key, as shown by `keys list`
        #[arg(short, long)]
        key_id: u64,

        /// User who owns the key (default: current login)
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Key type: rsa, ecdsa, ecdsa-sk, ed25519 or ed25519-sk
    #[arg(short = 't', long = "type", default_value = "rsa")]
    pub key_type: String,

    /// Destination file; a trailing <type> becomes the key type
    #[arg(short, long, default_value = "~/.ssh/id_<type>")]
    pub filename: String,

    /// Key size in bits
    #[arg(short, long)]
    pub bits: Option<u32>,

    /// Key comment, also the key's name on the server (default: user@host)
    #[arg(short = 'C', long)]
    pub comment: Option<String>,

    /// User to register the key for (default: current login)
    #[arg(short, long, conflicts_with = "no_add")]
    pub user: Option<String>,

    /// Passphrase for the private key; prompted for when absent
    #[arg(short = 'N', long)]
    pub passphrase: Option<String>,

    /// Replace existing key files without asking
    #[arg(long)]
    pub overwrite: bool,

    /// Only generate the key, do not register it
    #[arg(long)]
    pub no_add: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_new_defaults() {
        let cli = Cli::try_parse_from(["keyper", "keys", "new"]).unwrap();
        let Command::Keys(KeysCommand::New(args)) = cli.command else {
            panic!("expected keys new");
        };
        assert_eq!(args.key_type, "rsa");
        assert_eq!(args.filename, "~/.ssh/id_<type>");
        assert!(args.bits.is_none());
        assert!(!args.no_add);
    }

    #[test]
    fn test_user_conflicts_with_no_add() {
        let result =
            Cli::try_parse_from(["keyper", "keys", "new", "--user", "bob", "--no-add"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_passphrase_flag_is_kept() {
        let cli = Cli::try_parse_from(["keyper", "keys", "new", "-N", ""]).unwrap();
        let Command::Keys(KeysCommand::New(args)) = cli.command else {
            panic!("expected keys new");
        };
        assert_eq!(args.passphrase.as_deref(), Some(""));
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["keyper", "-vv", "version"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::new(2, 0, false));

        let cli = Cli::try_parse_from(["keyper", "version", "-q"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::new(0, 1, false));
    }

    #[test]
    fn test_delete_requires_key_id() {
        assert!(Cli::try_parse_from(["keyper", "keys", "delete"]).is_err());

        let cli = Cli::try_parse_from(["keyper", "keys", "delete", "--key-id", "9"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Keys(KeysCommand::Delete { key_id: 9, user: None })
        ));
    }
}
