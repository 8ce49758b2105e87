//! Database models for release-watch.
//!
//! These models map directly to the database schema.

pub mod version;
pub mod watched_item;

pub use version::*;
pub use watched_item::*;
