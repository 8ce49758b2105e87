//! Notification system module.
//!
//! Release events are shaped into channel-specific payloads and delivered to
//! every enabled channel (ntfy, Gotify, Discord, Slack).
//!
//! # Example
//!
//! ```ignore
//! use release_watch::notification::channels::{build_channels, ChannelsConfig, DiscordConfig};
//!
//! let config = ChannelsConfig {
//!     discord: DiscordConfig {
//!         webhook_url: "https://discord.com/api/webhooks/...".to_string(),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let channels = build_channels(&config, reqwest::Client::new());
//! ```

pub mod channels;
pub mod format;
pub mod payload;

pub use channels::{ChannelsConfig, NotificationChannel, build_channels};
pub use payload::{ChannelPayload, PayloadBody, SendError};
