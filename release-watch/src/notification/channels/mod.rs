//! Notification channels.
//!
//! This module provides the channels release events are delivered to:
//! - ntfy (push)
//! - Gotify (push)
//! - Discord webhooks
//! - Slack incoming webhooks

mod discord;
mod gotify;
mod ntfy;
mod slack;

#[cfg(test)]
pub(crate) mod test_support;

pub use discord::{DISCORD_MESSAGE_LIMIT, DiscordChannel, DiscordConfig};
pub use gotify::{GotifyChannel, GotifyConfig};
pub use ntfy::{NTFY_MESSAGE_LIMIT, NtfyChannel, NtfyConfig};
pub use slack::{SLACK_TEXT_LIMIT, SlackChannel, SlackConfig};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::payload::{ChannelPayload, SendError};
use crate::domain::{ReleaseEvent, SourceKind};

/// Trait for notification channels.
///
/// Detection happens once, upstream; a channel only shapes and delivers.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// A channel with missing required settings is disabled.
    fn is_enabled(&self) -> bool;

    /// Whether events of this source kind are delivered to the channel.
    fn supports(&self, _kind: SourceKind) -> bool {
        true
    }

    /// Shape an event into this channel's payload. Pure, never fails.
    fn format(&self, event: &ReleaseEvent) -> ChannelPayload;

    /// Whether a response status counts as delivered.
    fn accepts_status(&self, status: StatusCode) -> bool;

    /// Deliver a payload with a single request.
    async fn send(&self, payload: &ChannelPayload) -> Result<(), SendError>;
}

/// Configuration for every supported channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub ntfy: NtfyConfig,
    #[serde(default)]
    pub gotify: GotifyConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

impl ChannelsConfig {
    /// Type names of the channels whose required settings are present.
    pub fn enabled_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.ntfy.is_configured() {
            types.push("ntfy");
        }
        if self.gotify.is_configured() {
            types.push("gotify");
        }
        if self.discord.is_configured() {
            types.push("discord");
        }
        if self.slack.is_configured() {
            types.push("slack");
        }
        types
    }
}

/// Build the enabled channels, sharing one HTTP client.
pub fn build_channels(config: &ChannelsConfig, client: Client) -> Vec<Arc<dyn NotificationChannel>> {
    let candidates: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(NtfyChannel::with_client(config.ntfy.clone(), client.clone())),
        Arc::new(GotifyChannel::with_client(config.gotify.clone(), client.clone())),
        Arc::new(DiscordChannel::with_client(config.discord.clone(), client.clone())),
        Arc::new(SlackChannel::with_client(config.slack.clone(), client)),
    ];

    let channels: Vec<_> = candidates.into_iter().filter(|c| c.is_enabled()).collect();
    for channel in &channels {
        info!(channel = channel.channel_type(), "Notification channel enabled");
    }
    channels
}
