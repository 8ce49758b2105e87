//! Gotify push notification channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::NotificationChannel;
use crate::domain::ReleaseEvent;
use crate::notification::format::{self, Markup};
use crate::notification::payload::{ChannelPayload, SendError, deliver};
use crate::utils::http_client::build_client;

/// Gotify channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GotifyConfig {
    /// Server base URL, e.g. `https://gotify.example.com`.
    pub url: String,
    /// Application token.
    pub token: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    2
}

impl Default for GotifyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            priority: default_priority(),
        }
    }
}

impl GotifyConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }

    fn message_url(&self) -> String {
        format!("{}/message", self.url.trim_end_matches('/'))
    }
}

/// Gotify notification channel.
pub struct GotifyChannel {
    config: GotifyConfig,
    client: Client,
}

impl GotifyChannel {
    pub fn new(config: GotifyConfig) -> Self {
        Self::with_client(config, build_client(Duration::from_secs(30)))
    }

    pub fn with_client(config: GotifyConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for GotifyChannel {
    fn channel_type(&self) -> &'static str {
        "gotify"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn format(&self, event: &ReleaseEvent) -> ChannelPayload {
        ChannelPayload::json(json!({
            "title": format::title(event),
            "message": format::render_message(event, Markup::Markdown, None),
            "priority": self.config.priority,
            "extras": {
                "client::display": { "contentType": "text/markdown" },
                "client::notification": { "click": { "url": event.url } }
            }
        }))
    }

    fn accepts_status(&self, status: StatusCode) -> bool {
        status == StatusCode::OK
    }

    async fn send(&self, payload: &ChannelPayload) -> Result<(), SendError> {
        let request = self
            .client
            .post(self.config.message_url())
            .header("X-Gotify-Key", &self.config.token);

        deliver(self.channel_type(), request, payload, |s| self.accepts_status(s)).await?;

        debug!("Gotify notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::test_support::{image_event, repo_event, spawn_endpoint};
    use crate::notification::payload::PayloadBody;

    fn config(url: &str) -> GotifyConfig {
        GotifyConfig {
            url: url.to_string(),
            token: "app-token".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_url_and_token() {
        assert!(!GotifyConfig::default().is_configured());
        assert!(config("https://gotify.example").is_configured());
        assert_eq!(
            config("https://gotify.example/").message_url(),
            "https://gotify.example/message"
        );
    }

    #[test]
    fn test_format_is_not_truncated() {
        let channel = GotifyChannel::new(config("https://gotify.example"));
        let changelog = "z".repeat(10_000);
        let PayloadBody::Json(body) = channel.format(&repo_event(&changelog)).body else {
            panic!("gotify payload must be JSON");
        };
        assert_eq!(body["title"], "New version for app");
        assert_eq!(body["priority"], 2);
        assert!(body["message"].as_str().unwrap().contains(&changelog));
    }

    #[tokio::test]
    async fn test_send_uses_token_header() {
        let (base, captured) = spawn_endpoint(StatusCode::OK, r#"{"id":1}"#).await;
        let channel = GotifyChannel::new(config(&base));

        channel.send(&channel.format(&image_event())).await.unwrap();

        let requests = captured.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].uri.path(), "/message");
        assert_eq!(requests[0].header("x-gotify-key"), Some("app-token"));
        assert_eq!(requests[0].json()["title"], "Image updated: nginx");
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let (base, _captured) = spawn_endpoint(StatusCode::UNAUTHORIZED, "invalid token").await;
        let channel = GotifyChannel::new(config(&base));

        let err = channel
            .send(&channel.format(&image_event()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.channel(), "gotify");
    }
}
