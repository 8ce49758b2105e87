//! Slack incoming-webhook channel.
//!
//! Messages use Block Kit: a markdown section, a link button and a divider.
//! The top-level `text` is the title, used by Slack for notifications.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::NotificationChannel;
use crate::domain::ReleaseEvent;
use crate::notification::format::{self, Markup, MessageLimit};
use crate::notification::payload::{ChannelPayload, SendError, deliver};
use crate::utils::http_client::build_client;

/// Maximum length of a section block's text.
pub const SLACK_TEXT_LIMIT: usize = 3000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

impl SlackConfig {
    pub fn is_configured(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }
}

pub struct SlackChannel {
    config: SlackConfig,
    client: Client,
}

impl SlackChannel {
    pub fn new(config: SlackConfig) -> Self {
        Self::with_client(config, build_client(Duration::from_secs(30)))
    }

    pub fn with_client(config: SlackConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn channel_type(&self) -> &'static str {
        "slack"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn format(&self, event: &ReleaseEvent) -> ChannelPayload {
        ChannelPayload::json(json!({
            "text": format::title(event),
            "blocks": [
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format::render_message(
                            event,
                            Markup::SlackMrkdwn,
                            Some(MessageLimit::Chars(SLACK_TEXT_LIMIT)),
                        ),
                    }
                },
                {
                    "type": "actions",
                    "elements": [{
                        "type": "button",
                        "text": { "type": "plain_text", "text": format::link_label(event) },
                        "url": event.url,
                    }]
                },
                { "type": "divider" }
            ]
        }))
    }

    fn accepts_status(&self, status: StatusCode) -> bool {
        status == StatusCode::OK
    }

    async fn send(&self, payload: &ChannelPayload) -> Result<(), SendError> {
        let request = self.client.post(&self.config.webhook_url);
        deliver(self.channel_type(), request, payload, |s| self.accepts_status(s)).await?;

        debug!("Slack notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channels::test_support::{image_event, repo_event, spawn_endpoint};
    use crate::notification::payload::PayloadBody;

    fn body(payload: ChannelPayload) -> serde_json::Value {
        match payload.body {
            PayloadBody::Json(value) => value,
            PayloadBody::Text(_) => panic!("slack payload must be JSON"),
        }
    }

    #[test]
    fn test_blocks_layout() {
        let channel = SlackChannel::new(SlackConfig::default());
        let event = image_event();
        let body = body(channel.format(&event));

        assert_eq!(body["text"], "Image updated: nginx");
        let blocks = body["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["text"]["type"], "mrkdwn");
        assert_eq!(blocks[1]["elements"][0]["text"]["text"], "View Image");
        assert_eq!(blocks[1]["elements"][0]["url"], event.url.as_str());
        assert_eq!(blocks[2]["type"], "divider");
    }

    #[test]
    fn test_section_text_limit() {
        let channel = SlackChannel::new(SlackConfig::default());
        let event = repo_event(&"n".repeat(5000));
        let body = body(channel.format(&event));
        let text = body["blocks"][0]["text"]["text"].as_str().unwrap();

        assert!(text.chars().count() <= SLACK_TEXT_LIMIT);
        assert!(text.contains(&event.url));
    }

    #[tokio::test]
    async fn test_send() {
        let (base, captured) = spawn_endpoint(StatusCode::OK, "ok").await;
        let channel = SlackChannel::new(SlackConfig {
            webhook_url: format!("{base}/services/T0/B0/xyz"),
        });

        channel.send(&channel.format(&repo_event("notes"))).await.unwrap();

        let requests = captured.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, axum::http::Method::POST);
        assert_eq!(requests[0].json()["text"], "New version for app");
    }

    #[tokio::test]
    async fn test_send_invalid_payload() {
        let (base, _captured) = spawn_endpoint(StatusCode::BAD_REQUEST, "invalid_blocks").await;
        let channel = SlackChannel::new(SlackConfig { webhook_url: base });

        let err = channel
            .send(&channel.format(&repo_event("notes")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("invalid_blocks"));
    }
}
