//! Version database model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::ms_to_datetime;

/// Last observed version of a tracked item.
///
/// `version_marker` is the marker a notification was last dispatched for
/// (or the one recorded on first observation).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct VersionDbModel {
    /// Source kind: github, docker
    pub source_kind: String,
    pub identifier: String,
    pub version_marker: String,
    /// Cached changelog; empty for container images
    pub changelog: String,
    /// Unix epoch milliseconds
    pub updated_at: i64,
}

impl VersionDbModel {
    pub fn updated_at(&self) -> DateTime<Utc> {
        ms_to_datetime(self.updated_at)
    }
}
