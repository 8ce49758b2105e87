//! Release fetchers.
//!
//! A fetcher turns a [`TrackedItem`] into the latest [`ReleaseSnapshot`]
//! published by its registry. [`FetcherSet`] routes items to the fetcher for
//! their source kind.

mod docker;
mod github;

pub use docker::{DOCKER_HUB_API, DockerHubConfig, DockerHubFetcher};
pub use github::{GITHUB_API, GithubConfig, GithubFetcher};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::domain::{ReleaseSnapshot, SourceKind, TrackedItem};

/// Failure to fetch one item. Never fatal for a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{url} returned {status}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("no fetcher for {0} items")]
    Unsupported(SourceKind),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Source of the latest release of a tracked item.
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    /// Fetch the newest published version of `item`.
    async fn fetch_latest(&self, item: &TrackedItem) -> Result<ReleaseSnapshot, FetchError>;
}

/// One fetcher per source kind.
#[derive(Clone)]
pub struct FetcherSet {
    github: Arc<dyn ReleaseFetcher>,
    docker: Arc<dyn ReleaseFetcher>,
}

impl FetcherSet {
    pub fn new(github: Arc<dyn ReleaseFetcher>, docker: Arc<dyn ReleaseFetcher>) -> Self {
        Self { github, docker }
    }

    /// Build the registry-backed fetchers sharing one HTTP client.
    pub fn from_config(github: GithubConfig, docker: DockerHubConfig, client: Client) -> Self {
        Self::new(
            Arc::new(GithubFetcher::new(github, client.clone())),
            Arc::new(DockerHubFetcher::new(docker, client)),
        )
    }

    pub fn fetcher_for(&self, kind: SourceKind) -> &Arc<dyn ReleaseFetcher> {
        match kind {
            SourceKind::SourceRepository => &self.github,
            SourceKind::ContainerImage => &self.docker,
        }
    }
}

#[async_trait]
impl ReleaseFetcher for FetcherSet {
    async fn fetch_latest(&self, item: &TrackedItem) -> Result<ReleaseSnapshot, FetchError> {
        self.fetcher_for(item.source_kind).fetch_latest(item).await
    }
}
