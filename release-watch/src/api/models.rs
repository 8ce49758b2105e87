//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::VersionDbModel;
use crate::domain::{SourceKind, TrackedItem};

/// Default number of entries returned by `/api/versions/latest`.
pub const DEFAULT_LATEST_LIMIT: u32 = 5;
pub const MAX_LATEST_LIMIT: u32 = 100;

/// Body of watch-list add and remove requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchRequest {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedItemResponse {
    pub kind: SourceKind,
    pub identifier: String,
}

impl From<TrackedItem> for WatchedItemResponse {
    fn from(item: TrackedItem) -> Self {
        Self {
            kind: item.source_kind,
            identifier: item.identifier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchListResponse {
    pub items: Vec<WatchedItemResponse>,
    pub total: usize,
}

impl From<Vec<TrackedItem>> for WatchListResponse {
    fn from(items: Vec<TrackedItem>) -> Self {
        let items: Vec<WatchedItemResponse> = items.into_iter().map(Into::into).collect();
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestVersionsQuery {
    pub limit: Option<u32>,
}

impl LatestVersionsQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LATEST_LIMIT)
            .clamp(1, MAX_LATEST_LIMIT)
    }
}

/// A stored version, as listed by `/api/versions/latest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub kind: String,
    pub identifier: String,
    pub version_marker: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub changelog: String,
    pub updated_at: DateTime<Utc>,
}

impl From<VersionDbModel> for VersionResponse {
    fn from(row: VersionDbModel) -> Self {
        let updated_at = row.updated_at();
        Self {
            kind: row.source_kind,
            identifier: row.identifier,
            version_marker: row.version_marker,
            changelog: row.changelog,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}
