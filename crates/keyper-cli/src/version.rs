// ABOUTME: Release lookup for `keyper version --check`.
// ABOUTME: A memoizing cache with TTL and invalidation in front of a pluggable release source.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use semver::Version;
use serde::Deserialize;

/// Version of this build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const RELEASES_URL: &str = "https://api.github.com/repos/jsnfwlr/keyper-cli/releases/latest";

/// Where the latest release tag comes from.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest_tag(&self) -> Result<String>;
}

/// GitHub "latest release" endpoint.
pub struct GithubReleases {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

impl GithubReleases {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("keyper/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: RELEASES_URL.to_string(),
        })
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn latest_tag(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "problem with GET request for {} (status code: {}): {}",
                self.url,
                status.as_u16(),
                body
            );
        }

        let release: Release = response
            .json()
            .await
            .context("failed to decode release response")?;
        Ok(release.tag_name)
    }
}

/// Remembers the latest release for `ttl`.
pub struct ReleaseCache<S> {
    source: S,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Version)>>,
}

impl<S: ReleaseSource> ReleaseCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Latest released version, fetched at most once per `ttl`.
    pub async fn latest(&self) -> Result<Version> {
        if let Some(version) = self.fresh() {
            return Ok(version);
        }

        let tag = self.source.latest_tag().await?;
        let version = parse_tag(&tag)?;
        tracing::debug!(%version, "fetched latest release");

        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some((Instant::now(), version.clone()));
        }
        Ok(version)
    }

    /// Drop the remembered release so the next call refetches.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }

    fn fresh(&self) -> Option<Version> {
        let cached = self.cached.lock().ok()?;
        match cached.as_ref() {
            Some((at, version)) if at.elapsed() < self.ttl => Some(version.clone()),
            _ => None,
        }
    }
}

/// Parse a release tag such as `v1.2.3`.
pub fn parse_tag(tag: &str) -> Result<Version> {
    let trimmed = tag.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).with_context(|| format!("invalid release tag {tag:?}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available(Version),
}

pub fn compare(current: &Version, latest: &Version) -> UpdateStatus {
    if latest > current {
        UpdateStatus::Available(latest.clone())
    } else {
        UpdateStatus::UpToDate
    }
}
