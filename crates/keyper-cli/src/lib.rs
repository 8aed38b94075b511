// ABOUTME: Library behind the keyper binary
// ABOUTME: Dispatches parsed commands to key generation, listing, deletion and version checks

use anyhow::Result;

pub mod commands;
pub mod params;
pub mod prompt;
pub mod reconcile;
pub mod version;

pub use commands::{Cli, Command, KeysCommand, NewArgs, ServerArgs};
pub use params::{Environment, KeyParameters};
pub use prompt::{DialoguerPrompter, PromptedPin, Prompter};
pub use reconcile::{Outcome, Reconciler, Reconciliation};

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command, server, ..
    } = cli;
    let env = Environment::detect();
    tracing::debug!(login = %env.login, host = %env.hostname, "detected environment");

    match command {
        Command::Keys(KeysCommand::New(args)) => {
            let prompter = DialoguerPrompter::default();
            commands::new::run(args, &server, &env, &prompter).await
        }
        Command::Keys(KeysCommand::List { user }) => {
            commands::list::run(user, &server, &env).await
        }
        Command::Keys(KeysCommand::Delete { key_id, user }) => {
            commands::delete::run(key_id, user, &server, &env).await
        }
        Command::Version { check } => commands::version::run(check).await,
    }
}
