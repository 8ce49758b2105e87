//! release-watch library crate.
//!
//! Polls GitHub releases and Docker Hub tags for a watch list stored in
//! SQLite and notifies ntfy, Gotify, Discord and Slack when a new version
//! appears.

pub mod api;
pub mod config;
pub mod database;
pub mod detector;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod notification;
pub mod utils;

pub use error::{Error, Result};
