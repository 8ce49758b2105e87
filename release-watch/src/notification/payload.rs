//! Channel payloads and delivery errors.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use thiserror::Error;
use tracing::warn;

/// Upper bound on the response body kept in a [`SendError`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// A formatted notification, ready to be sent to one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPayload {
    /// Extra request headers (credentials are added by the sender).
    pub headers: Vec<(String, String)>,
    pub body: PayloadBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBody {
    /// Plain-text request body.
    Text(String),
    /// JSON request body.
    Json(serde_json::Value),
}

impl ChannelPayload {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            headers: Vec::new(),
            body: PayloadBody::Text(body.into()),
        }
    }

    pub fn json(body: serde_json::Value) -> Self {
        Self {
            headers: Vec::new(),
            body: PayloadBody::Json(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Build the request headers, skipping any that are not valid HTTP.
    pub fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                name.parse::<HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping invalid notification header"),
            }
        }
        headers
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.headers(self.header_map());
        match &self.body {
            PayloadBody::Text(text) => request
                .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text.clone()),
            PayloadBody::Json(value) => request.json(value),
        }
    }
}

/// Failure to deliver one payload to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("{channel} returned {status}: {body}")]
    Status {
        channel: &'static str,
        status: u16,
        body: String,
    },

    #[error("{channel} request failed: {message}")]
    Transport {
        channel: &'static str,
        message: String,
    },
}

impl SendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    pub fn channel(&self) -> &'static str {
        match self {
            Self::Status { channel, .. } | Self::Transport { channel, .. } => channel,
        }
    }
}

/// Send `payload` with `request` and judge the response with `accepts`.
///
/// Exactly one request is made; nothing is retried.
pub async fn deliver(
    channel: &'static str,
    request: RequestBuilder,
    payload: &ChannelPayload,
    accepts: impl Fn(StatusCode) -> bool,
) -> Result<(), SendError> {
    let response = payload
        .apply(request)
        .send()
        .await
        .map_err(|e| SendError::Transport {
            channel,
            message: e.to_string(),
        })?;

    let status = response.status();
    if accepts(status) {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    Err(SendError::Status {
        channel,
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let payload = ChannelPayload::text("hi").with_header("Title", "New version");
        assert_eq!(payload.header("title"), Some("New version"));
        assert_eq!(payload.header("Priority"), None);
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let payload = ChannelPayload::text("hi")
            .with_header("Title", "ok")
            .with_header("Bad Header", "x")
            .with_header("Broken", "line\nbreak");
        let headers = payload.header_map();
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("title"));
    }

    #[test]
    fn test_send_error_accessors() {
        let err = SendError::Status {
            channel: "discord",
            status: 400,
            body: "bad".to_string(),
        };
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.channel(), "discord");
        assert_eq!(err.to_string(), "discord returned 400: bad");

        let err = SendError::Transport {
            channel: "slack",
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
    }
}
