//! Discord webhook notification channel.

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

/// Discord rejects message content longer than 2000 characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Discord channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Webhook URL.
    pub webhook_url: String,
    /// Bot username override.
    pub username: Option<String>,
    /// Avatar URL override.
    pub avatar_url: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            username: Some("release-watch".to_string()),
            avatar_url: None,
        }
    }
}

impl DiscordConfig {
    pub fn is_configured(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }
}

/// Discord webhook notification channel.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: Client,
}

impl DiscordChannel {
    /// Create a new Discord channel.
    pub fn new(config: DiscordConfig) -> Self {
        Self::with_client(config, build_client(Duration::from_secs(30)))
    }

    pub fn with_client(config: DiscordConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn channel_type(&self) -> &'static str {
        "discord"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn format(&self, event: &ReleaseEvent) -> ChannelPayload {
        let mut body = json!({
            "content": format::render_message(
                event,
                Markup::Markdown,
                Some(MessageLimit::Chars(DISCORD_MESSAGE_LIMIT)),
            ),
        });
        if let Some(username) = &self.config.username {
            body["username"] = json!(username);
        }
        if let Some(avatar_url) = &self.config.avatar_url {
            body["avatar_url"] = json!(avatar_url);
        }
        ChannelPayload::json(body)
    }

    /// Webhooks answer 204 No Content unless `?wait=true` is set.
    fn accepts_status(&self, status: StatusCode) -> bool {
        status.is_success()
    }

    async fn send(&self, payload: &ChannelPayload) -> Result<(), SendError> {
        let request = self.client.post(&self.config.webhook_url);
        deliver(self.channel_type(), request, payload, |s| self.accepts_status(s)).await?;

        debug!("Discord notification sent");
        Ok(())
    }
}
