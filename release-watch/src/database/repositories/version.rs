//! Version store repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::VersionDbModel;
use crate::database::retry::retry_on_sqlite_busy;
use crate::database::time::now_ms;
use crate::domain::TrackedItem;

/// Version store trait.
///
/// Rows leave the store only through watch-list removal or
/// [`VersionRepository::prune_orphans`].
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// `Ok(None)` means no row exists. Storage failures are always `Err`.
    async fn get(&self, item: &TrackedItem) -> Result<Option<VersionDbModel>>;

    /// Atomic insert-or-replace of one row.
    async fn upsert(&self, item: &TrackedItem, version_marker: &str, changelog: &str)
    -> Result<()>;

    /// Most recently updated rows first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<VersionDbModel>>;

    /// Delete rows whose item is no longer on the watch list.
    async fn prune_orphans(&self) -> Result<u64>;
}

/// SQLx implementation of VersionRepository.
pub struct SqlxVersionRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqlxVersionRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self { pool, write_pool }
    }
}

#[async_trait]
impl VersionRepository for SqlxVersionRepository {
    async fn get(&self, item: &TrackedItem) -> Result<Option<VersionDbModel>> {
        let row = sqlx::query_as::<_, VersionDbModel>(
            "SELECT * FROM versions WHERE source_kind = ? AND identifier = ?",
        )
        .bind(item.source_kind.as_str())
        .bind(&item.identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert(
        &self,
        item: &TrackedItem,
        version_marker: &str,
        changelog: &str,
    ) -> Result<()> {
        retry_on_sqlite_busy("version_upsert", || async {
            sqlx::query(
                r#"
                INSERT INTO versions (source_kind, identifier, version_marker, changelog, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (source_kind, identifier) DO UPDATE SET
                    version_marker = excluded.version_marker,
                    changelog = excluded.changelog,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(item.source_kind.as_str())
            .bind(&item.identifier)
            .bind(version_marker)
            .bind(changelog)
            .bind(now_ms())
            .execute(&self.write_pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<VersionDbModel>> {
        let rows = sqlx::query_as::<_, VersionDbModel>(
            "SELECT * FROM versions ORDER BY updated_at DESC, identifier LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn prune_orphans(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM versions
            WHERE NOT EXISTS (
                SELECT 1 FROM watched_items w
                WHERE w.source_kind = versions.source_kind
                  AND w.identifier = versions.identifier
            )
            "#,
        )
        .execute(&self.write_pool)
        .await?;
        Ok(result.rows_affected())
    }
}
