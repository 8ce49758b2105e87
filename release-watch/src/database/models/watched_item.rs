//! Watched item database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::now_ms;
use crate::domain::{SourceKind, TrackedItem};
use crate::{Error, Result};

/// One row of the watch list.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WatchedItemDbModel {
    /// Source kind: github, docker
    pub source_kind: String,
    pub identifier: String,
    /// Unix epoch milliseconds
    pub created_at: i64,
}

impl WatchedItemDbModel {
    pub fn new(item: &TrackedItem) -> Self {
        Self {
            source_kind: item.source_kind.as_str().to_string(),
            identifier: item.identifier.clone(),
            created_at: now_ms(),
        }
    }

    pub fn to_tracked_item(&self) -> Result<TrackedItem> {
        let kind = self.source_kind.parse::<SourceKind>().map_err(|_| {
            Error::Database(format!("unknown source kind '{}'", self.source_kind))
        })?;
        Ok(TrackedItem::new(kind, self.identifier.clone()))
    }
}
