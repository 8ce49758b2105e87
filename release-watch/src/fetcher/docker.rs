//! Docker Hub tag fetcher.
//!
//! The version marker of an image is the digest of its `latest` tag. With
//! credentials configured, a login token is requested once and reused until
//! Docker Hub rejects it. A failed login falls back to anonymous requests and
//! is not retried before [`LOGIN_RETRY_AFTER`] has passed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{FetchError, ReleaseFetcher};
use crate::domain::{ReleaseSnapshot, TrackedItem};

pub const DOCKER_HUB_API: &str = "https://hub.docker.com";

pub const LOGIN_RETRY_AFTER: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_api_base() -> String {
    DOCKER_HUB_API.to_string()
}

impl Default for DockerHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            username: None,
            password: None,
        }
    }
}

impl DockerHubConfig {
    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    digest: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    images: Vec<TagImage>,
}

#[derive(Debug, Deserialize)]
struct TagImage {
    digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Default)]
enum Login {
    #[default]
    Pending,
    Token(String),
    Failed(Instant),
}

pub struct DockerHubFetcher {
    config: DockerHubConfig,
    client: Client,
    login: Mutex<Login>,
}

impl DockerHubFetcher {
    pub fn new(config: DockerHubConfig, client: Client) -> Self {
        Self {
            config,
            client,
            login: Mutex::new(Login::Pending),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Cached login token, logging in first if needed.
    ///
    /// Returns `None` without credentials or while a failed login is still
    /// recent; the request then goes out anonymously.
    async fn token(&self) -> Option<String> {
        let (username, password) = self.config.credentials()?;

        let mut login = self.login.lock().await;
        match &*login {
            Login::Token(token) => return Some(token.clone()),
            Login::Failed(at) if at.elapsed() < LOGIN_RETRY_AFTER => return None,
            _ => {}
        }

        match self.request_token(username, password).await {
            Ok(token) => {
                debug!("Obtained Docker Hub token");
                *login = Login::Token(token.clone());
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "Docker Hub login failed, continuing without a token");
                *login = Login::Failed(Instant::now());
                None
            }
        }
    }

    async fn request_token(&self, username: &str, password: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .post(self.api_url("/v2/users/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?
            .error_for_status()?;
        let login: LoginResponse = response.json().await?;
        Ok(login.token)
    }
}

/// Official images are published under the `library` namespace.
pub fn repository_path(identifier: &str) -> String {
    if identifier.contains('/') {
        identifier.to_string()
    } else {
        format!("library/{identifier}")
    }
}

/// Public page of an image. Official images live under `/_/`.
pub fn image_page_url(identifier: &str) -> String {
    let path = repository_path(identifier);
    match path.strip_prefix("library/") {
        Some(name) => format!("https://hub.docker.com/_/{name}"),
        None => format!("https://hub.docker.com/r/{path}"),
    }
}

#[async_trait]
impl ReleaseFetcher for DockerHubFetcher {
    async fn fetch_latest(&self, item: &TrackedItem) -> Result<ReleaseSnapshot, FetchError> {
        let repository = repository_path(&item.identifier);
        let mut request = self
            .client
            .get(self.api_url(&format!("/v2/repositories/{repository}/tags/latest")));
        let token = self.token().await;
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if token.is_some() && response.status() == StatusCode::UNAUTHORIZED {
            warn!(image = %repository, "Docker Hub rejected the token, logging in again next time");
            *self.login.lock().await = Login::Pending;
        }
        let tag: TagResponse = response.error_for_status()?.json().await?;

        let digest = tag
            .digest
            .or_else(|| tag.images.into_iter().find_map(|image| image.digest))
            .ok_or_else(|| FetchError::Decode(format!("no digest for {repository}:latest")))?;

        debug!(image = %repository, digest = %digest, "Fetched latest tag");

        let mut snapshot =
            ReleaseSnapshot::new(item.clone(), digest, image_page_url(&item.identifier));
        if let Some(last_updated) = tag.last_updated {
            snapshot = snapshot.with_published_at(last_updated);
        }
        Ok(snapshot)
    }
}
