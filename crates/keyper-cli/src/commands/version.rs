// ABOUTME: Implementation of 'keyper version'
// ABOUTME: Prints the build version and optionally checks for a newer release

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use semver::Version;

use crate::version::{compare, GithubReleases, ReleaseCache, UpdateStatus, CURRENT_VERSION};

const RELEASE_TTL: Duration = Duration::from_secs(15 * 60);

pub async fn run(check: bool) -> Result<()> {
    println!("keyper {CURRENT_VERSION}");
    if !check {
        return Ok(());
    }

    let cache = ReleaseCache::new(GithubReleases::new()?, RELEASE_TTL);
    let latest = cache
        .latest()
        .await
        .context("failed to check for a newer release")?;
    let current = Version::parse(CURRENT_VERSION)?;

    match compare(&current, &latest) {
        UpdateStatus::UpToDate => println!("{}", "keyper is up to date".green()),
        UpdateStatus::Available(version) => println!(
            "{}",
            format!("keyper {version} is available (you have {current})").yellow()
        ),
    }
    Ok(())
}
