//! Repository layer for database access.
//!
//! Every interaction with the watch list and the version store goes through
//! these traits, so the dispatcher and API can be exercised against fakes.

pub mod version;
pub mod watch_list;

pub use version::*;
pub use watch_list::*;
