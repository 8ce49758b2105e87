//! GitHub releases fetcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FetchError, ReleaseFetcher};
use crate::domain::{ReleaseSnapshot, TrackedItem};

pub const GITHUB_API: &str = "https://api.github.com";

/// Used when neither the latest release nor the release list carries notes.
const CHANGELOG_NOT_AVAILABLE: &str = "Changelog not available";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Personal access token; raises the API rate limit.
    pub token: Option<String>,
}

fn default_api_base() -> String {
    GITHUB_API.to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    html_url: String,
    published_at: Option<DateTime<Utc>>,
    body: Option<String>,
}

pub struct GithubFetcher {
    config: GithubConfig,
    client: Client,
}

impl GithubFetcher {
    pub fn new(config: GithubConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        match self.config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Body of the most recent entry of the release list, if any.
    async fn first_listed_body(&self, repo: &str) -> Result<Option<String>, FetchError> {
        let releases: Vec<GithubRelease> = self
            .get(&format!("/repos/{repo}/releases?per_page=1"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(releases.into_iter().next().and_then(|r| non_empty(r.body)))
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[async_trait]
impl ReleaseFetcher for GithubFetcher {
    async fn fetch_latest(&self, item: &TrackedItem) -> Result<ReleaseSnapshot, FetchError> {
        let repo = &item.identifier;
        let release: GithubRelease = self
            .get(&format!("/repos/{repo}/releases/latest"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let changelog = match non_empty(release.body) {
            Some(body) => body,
            None => self
                .first_listed_body(repo)
                .await
                .unwrap_or_else(|e| {
                    debug!(repo = %repo, error = %e, "Release list lookup failed");
                    None
                })
                .unwrap_or_else(|| CHANGELOG_NOT_AVAILABLE.to_string()),
        };

        debug!(repo = %repo, tag = %release.tag_name, "Fetched latest release");

        let mut snapshot = ReleaseSnapshot::new(item.clone(), release.tag_name, release.html_url)
            .with_changelog(changelog);
        if let Some(published_at) = release.published_at {
            snapshot = snapshot.with_published_at(published_at);
        }
        Ok(snapshot)
    }
}
