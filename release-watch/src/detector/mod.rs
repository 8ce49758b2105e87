//! Change detection.
//!
//! The detector is the only place that decides whether a fetched snapshot is
//! news. A changed version is persisted before its [`ReleaseEvent`] exists, so
//! a notification can never precede the store update that records it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;
use crate::database::repositories::VersionRepository;
use crate::domain::{ReleaseEvent, ReleaseSnapshot};

/// What to do the first time an item is observed.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FirstSeenPolicy {
    /// Record the version and notify.
    #[default]
    Notify,
    /// Record the version without notifying.
    SeedOnly,
}

/// Compares snapshots against the version store.
pub struct ChangeDetector<V: VersionRepository + ?Sized + 'static> {
    versions: Arc<V>,
    first_seen: FirstSeenPolicy,
}

impl<V: VersionRepository + ?Sized + 'static> ChangeDetector<V> {
    pub fn new(versions: Arc<V>) -> Self {
        Self::with_policy(versions, FirstSeenPolicy::default())
    }

    pub fn with_policy(versions: Arc<V>, first_seen: FirstSeenPolicy) -> Self {
        Self {
            versions,
            first_seen,
        }
    }

    pub fn first_seen_policy(&self) -> FirstSeenPolicy {
        self.first_seen
    }

    /// Decide whether `snapshot` is a new version.
    ///
    /// Returns `Ok(None)` when the stored marker is identical. A store read
    /// error is returned as is and never mistaken for an absent row; an
    /// upsert error also fails, so no event exists for an unrecorded version.
    pub async fn detect(&self, snapshot: ReleaseSnapshot) -> Result<Option<ReleaseEvent>> {
        let stored = self.versions.get(&snapshot.item).await?;

        let first_seen = match &stored {
            Some(row) if row.version_marker == snapshot.version_marker => {
                debug!(item = %snapshot.item, marker = %snapshot.version_marker, "No change");
                return Ok(None);
            }
            Some(_) => false,
            None => true,
        };

        self.versions
            .upsert(
                &snapshot.item,
                &snapshot.version_marker,
                snapshot.stored_changelog(),
            )
            .await?;

        if first_seen && self.first_seen == FirstSeenPolicy::SeedOnly {
            info!(item = %snapshot.item, marker = %snapshot.version_marker, "Seeded first version");
            return Ok(None);
        }

        info!(
            item = %snapshot.item,
            previous = stored.as_ref().map(|row| row.version_marker.as_str()).unwrap_or("-"),
            marker = %snapshot.version_marker,
            "New version detected"
        );
        Ok(Some(ReleaseEvent::from_snapshot(snapshot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::database::models::VersionDbModel;
    use crate::database::repositories::SqlxVersionRepository;
    use crate::domain::TrackedItem;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn store() -> Arc<SqlxVersionRepository> {
        let db = Database::in_memory().await.unwrap();
        Arc::new(SqlxVersionRepository::new(db.pool, db.write_pool))
    }

    fn snapshot(marker: &str) -> ReleaseSnapshot {
        ReleaseSnapshot::new(
            TrackedItem::github("acme/app"),
            marker,
            format!("https://github.com/acme/app/releases/tag/{marker}"),
        )
        .with_changelog(format!("notes for {marker}"))
    }

    /// Fails reads or writes on demand and counts upserts.
    #[derive(Default)]
    struct BrokenStore {
        fail_get: bool,
        stored: Option<String>,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl VersionRepository for BrokenStore {
        async fn get(&self, item: &TrackedItem) -> Result<Option<VersionDbModel>> {
            if self.fail_get {
                return Err(Error::Database("disk I/O error".to_string()));
            }
            Ok(self.stored.as_ref().map(|marker| VersionDbModel {
                source_kind: item.source_kind.as_str().to_string(),
                identifier: item.identifier.clone(),
                version_marker: marker.clone(),
                changelog: String::new(),
                updated_at: 0,
            }))
        }

        async fn upsert(&self, _item: &TrackedItem, _marker: &str, _changelog: &str) -> Result<()> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Database("database is full".to_string()))
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<VersionDbModel>> {
            Ok(Vec::new())
        }

        async fn prune_orphans(&self) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_first_seen_notifies_and_records() {
        let versions = store().await;
        let detector = ChangeDetector::new(versions.clone());

        let event = detector.detect(snapshot("v1.0.0")).await.unwrap().unwrap();
        assert_eq!(event.version_marker, "v1.0.0");

        let row = versions.get(&TrackedItem::github("acme/app")).await.unwrap().unwrap();
        assert_eq!(row.version_marker, "v1.0.0");
        assert_eq!(row.changelog, "notes for v1.0.0");
    }

    #[tokio::test]
    async fn test_same_marker_is_idempotent() {
        let versions = store().await;
        let detector = ChangeDetector::new(versions.clone());

        assert!(detector.detect(snapshot("v1.0.0")).await.unwrap().is_some());
        let before = versions.get(&TrackedItem::github("acme/app")).await.unwrap().unwrap();

        for _ in 0..3 {
            assert!(detector.detect(snapshot("v1.0.0")).await.unwrap().is_none());
        }
        let after = versions.get(&TrackedItem::github("acme/app")).await.unwrap().unwrap();
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[tokio::test]
    async fn test_changed_marker_emits_one_event() {
        let versions = store().await;
        let detector = ChangeDetector::new(versions.clone());

        detector.detect(snapshot("v1.0.0")).await.unwrap();
        let event = detector.detect(snapshot("v1.1.0")).await.unwrap().unwrap();
        assert_eq!(event.version_marker, "v1.1.0");
        assert!(detector.detect(snapshot("v1.1.0")).await.unwrap().is_none());

        // Markers are compared for equality only, never ordered.
        let event = detector.detect(snapshot("v0.9.0")).await.unwrap();
        assert!(event.is_some());
    }

    #[tokio::test]
    async fn test_image_changelog_is_not_stored() {
        let versions = store().await;
        let detector = ChangeDetector::new(versions.clone());
        let item = TrackedItem::docker("library/nginx");
        let snapshot = ReleaseSnapshot::new(item.clone(), "sha256:abc", "https://hub.docker.com/_/nginx")
            .with_changelog("ignored");

        detector.detect(snapshot).await.unwrap();
        let row = versions.get(&item).await.unwrap().unwrap();
        assert_eq!(row.changelog, "");
    }

    #[tokio::test]
    async fn test_seed_only_policy() {
        let versions = store().await;
        let detector = ChangeDetector::with_policy(versions.clone(), FirstSeenPolicy::SeedOnly);

        assert!(detector.detect(snapshot("v1.0.0")).await.unwrap().is_none());
        assert!(versions.get(&TrackedItem::github("acme/app")).await.unwrap().is_some());
        assert!(detector.detect(snapshot("v1.0.1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_read_failure_is_not_absent() {
        let versions = Arc::new(BrokenStore {
            fail_get: true,
            ..Default::default()
        });
        let detector = ChangeDetector::new(versions.clone());

        assert!(detector.detect(snapshot("v1.0.0")).await.is_err());
        assert_eq!(versions.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_write_failure_suppresses_event() {
        let versions = Arc::new(BrokenStore {
            stored: Some("v1.0.0".to_string()),
            ..Default::default()
        });
        let detector = ChangeDetector::new(versions.clone());

        assert!(detector.detect(snapshot("v1.1.0")).await.is_err());
        assert_eq!(versions.upserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("seed_only".parse::<FirstSeenPolicy>().unwrap(), FirstSeenPolicy::SeedOnly);
        assert_eq!(FirstSeenPolicy::default().to_string(), "notify");
    }
}
