// ABOUTME: Entry point for the keyper CLI
// ABOUTME: Loads .env, sets up logging and reports any failure with exit status 1

use clap::Parser;
use colored::Colorize;
use keyper_cli::Cli;

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    keyper_log::init(cli.verbosity());

    if let Err(err) = keyper_cli::run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}
