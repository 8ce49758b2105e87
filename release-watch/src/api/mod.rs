//! Admin HTTP API.
//!
//! JSON endpoints for managing the watch list and inspecting recently
//! stored versions, plus health probes.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
