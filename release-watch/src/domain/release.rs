//! Release snapshots and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SourceKind, TrackedItem};

/// Rendered in place of a missing publication date.
pub const UNKNOWN_PUBLISHED_AT: &str = "unknown";

/// The fetched state of a tracked item as of one polling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSnapshot {
    pub item: TrackedItem,
    /// Tag name for repositories, content digest for images.
    pub version_marker: String,
    pub display_name: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Only populated for source repositories.
    pub changelog: Option<String>,
}

impl ReleaseSnapshot {
    pub fn new(
        item: TrackedItem,
        version_marker: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let display_name = item.short_name().to_string();
        Self {
            item,
            version_marker: version_marker.into(),
            display_name,
            url: url.into(),
            published_at: None,
            changelog: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_changelog(mut self, changelog: impl Into<String>) -> Self {
        self.changelog = Some(changelog.into());
        self
    }

    pub fn source_kind(&self) -> SourceKind {
        self.item.source_kind
    }

    /// Changelog text to persist; always empty for container images.
    pub fn stored_changelog(&self) -> &str {
        match self.item.source_kind {
            SourceKind::SourceRepository => self.changelog.as_deref().unwrap_or(""),
            SourceKind::ContainerImage => "",
        }
    }

    /// Publication date as shown to users, e.g. `2025-01-31 12:00:00`.
    pub fn published_at_display(&self) -> String {
        self.published_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| UNKNOWN_PUBLISHED_AT.to_string())
    }
}

/// A snapshot that is new since the last dispatch for its item.
///
/// Only the change detector creates these, after the new version has been
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReleaseEvent(ReleaseSnapshot);

impl ReleaseEvent {
    pub(crate) fn from_snapshot(snapshot: ReleaseSnapshot) -> Self {
        Self(snapshot)
    }

    pub fn snapshot(&self) -> &ReleaseSnapshot {
        &self.0
    }

    pub fn into_snapshot(self) -> ReleaseSnapshot {
        self.0
    }
}

impl std::ops::Deref for ReleaseEvent {
    type Target = ReleaseSnapshot;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_published_at_display() {
        let snapshot = ReleaseSnapshot::new(
            TrackedItem::github("acme/app"),
            "v1.0.0",
            "https://github.com/acme/app/releases/tag/v1.0.0",
        );
        assert_eq!(snapshot.published_at_display(), UNKNOWN_PUBLISHED_AT);

        let snapshot =
            snapshot.with_published_at(Utc.with_ymd_and_hms(2025, 1, 31, 12, 30, 0).unwrap());
        assert_eq!(snapshot.published_at_display(), "2025-01-31 12:30:00");
    }

    #[test]
    fn test_stored_changelog_ignores_images() {
        let image = ReleaseSnapshot::new(
            TrackedItem::docker("library/nginx"),
            "sha256:abc",
            "https://hub.docker.com/_/nginx",
        )
        .with_changelog("should not be stored");
        assert_eq!(image.stored_changelog(), "");

        let repo = ReleaseSnapshot::new(TrackedItem::github("acme/app"), "v1", "u")
            .with_changelog("initial");
        assert_eq!(repo.stored_changelog(), "initial");
        assert_eq!(repo.display_name, "app");
    }
}
