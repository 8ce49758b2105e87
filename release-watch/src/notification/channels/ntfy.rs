//! ntfy push notification channel.
//!
//! Publishes a markdown message to a topic URL; title, priority and a "view"
//! action are passed as ntfy headers.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::NotificationChannel;
use crate::domain::ReleaseEvent;
use crate::notification::format::{self, Markup, MessageLimit};
use crate::notification::payload::{ChannelPayload, SendError, deliver};
use crate::utils::http_client::build_client;

/// ntfy truncates message bodies above 4096 bytes.
pub const NTFY_MESSAGE_LIMIT: usize = 4096;

/// ntfy channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NtfyConfig {
    /// Full topic URL, e.g. `https://ntfy.sh/releases`.
    pub url: String,
    /// Basic auth user name.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Base64 of `user:password`, sent as is with the Basic scheme.
    pub encoded_credentials: Option<String>,
    /// Access token (takes precedence over basic auth).
    pub access_token: Option<String>,
    /// Message priority: min, low, default, high, urgent.
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "urgent".to_string()
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            encoded_credentials: None,
            access_token: None,
            priority: default_priority(),
        }
    }
}

impl NtfyConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Value of the `Authorization` header, if credentials are configured.
    fn authorization(&self) -> Option<String> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Some(format!("Bearer {}", token));
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => {
                Some(format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))))
            }
            _ => self
                .encoded_credentials
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(|c| format!("Basic {c}")),
        }
    }
}

/// ntfy notification channel.
pub struct NtfyChannel {
    config: NtfyConfig,
    client: Client,
}

impl NtfyChannel {
    /// Create a new ntfy channel with its own HTTP client.
    pub fn new(config: NtfyConfig) -> Self {
        Self::with_client(config, build_client(Duration::from_secs(30)))
    }

    pub fn with_client(config: NtfyConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl NotificationChannel for NtfyChannel {
    fn channel_type(&self) -> &'static str {
        "ntfy"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn format(&self, event: &ReleaseEvent) -> ChannelPayload {
        let message = format::render_message(
            event,
            Markup::Markdown,
            Some(MessageLimit::Bytes(NTFY_MESSAGE_LIMIT)),
        );
        ChannelPayload::text(message)
            .with_header("Title", format::title(event))
            .with_header("Priority", self.config.priority.clone())
            .with_header("Markdown", "yes")
            .with_header("Click", event.url.clone())
            .with_header(
                "Actions",
                format!(
                    "view, {}, {}, clear=true",
                    format::link_label(event),
                    event.url
                ),
            )
    }

    fn accepts_status(&self, status: StatusCode) -> bool {
        status == StatusCode::OK
    }

    async fn send(&self, payload: &ChannelPayload) -> Result<(), SendError> {
        let mut request = self.client.post(&self.config.url);
        if let Some(auth) = self.config.authorization() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        deliver(self.channel_type(), request, payload, |s| self.accepts_status(s)).await?;

        debug!("ntfy notification sent");
        Ok(())
    }
}
