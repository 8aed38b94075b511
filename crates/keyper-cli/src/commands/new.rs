// ABOUTME: Implementation of 'keyper keys new'
// ABOUTME: Generates a key pair, shows its fingerprint and registers it with the server

use std::path::Path;
use std::process::Command as Process;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use keyper_ssh::{default_provider, GeneratedKey};

use super::{NewArgs, ServerArgs};
use crate::params::{Environment, KeyParameters};
use crate::prompt::{PromptedPin, Prompter};
use crate::reconcile::Reconciler;

pub async fn run(
    args: NewArgs,
    server: &ServerArgs,
    env: &Environment,
    prompter: &dyn Prompter,
) -> Result<()> {
    let params = KeyParameters::collect(&args, env, prompter)?;
    if params.register && params.username.is_empty() {
        bail!("cannot determine the user to register the key for, use --user");
    }

    println!(
        "Generating public/private {} key pair.",
        params.algorithm.suffix()
    );

    let tokens = default_provider();
    let pin = PromptedPin::new(prompter);
    let generated = keyper_ssh::generate(&params.request(), tokens.as_ref(), &pin)
        .with_context(|| format!("failed to generate {} key", params.algorithm.short()))?;

    print_summary(&generated, &params.comment);
    print_randomart(&generated.public_path);

    if !params.register {
        return Ok(());
    }

    let api = server.connect().await?;
    let result = Reconciler::new(&api, prompter, &env.hostname)
        .reconcile(&params.username, &params.comment, &generated)
        .await?;

    println!("{}", result.to_string().green());
    Ok(())
}

fn print_summary(key: &GeneratedKey, comment: &str) {
    if let Some(private) = &key.private_path {
        println!(
            "Your identification has been saved in {}",
            private.display().to_string().bold()
        );
    }
    println!(
        "Your public key has been saved in {}",
        key.public_path.display().to_string().bold()
    );
    println!("The key fingerprint is:");
    println!("{} {}", key.fingerprint.cyan(), comment);
}

/// Print the key's randomart using `ssh-keygen`, when it is installed.
fn print_randomart(public_path: &Path) {
    let output = match Process::new("ssh-keygen")
        .arg("-lvf")
        .arg(public_path)
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            tracing::debug!(status = %output.status, "ssh-keygen could not read the key");
            return;
        }
        Err(e) => {
            tracing::debug!(error = %e, "ssh-keygen unavailable, skipping randomart");
            return;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let art = randomart_lines(&stdout);
    if !art.is_empty() {
        println!("The key's randomart image is:");
        for line in art {
            println!("{line}");
        }
    }
}

/// The fingerprint line of `ssh-keygen -lv` output contains ':'; the art does not.
fn randomart_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.contains(':'))
        .collect()
}
