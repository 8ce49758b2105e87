//! Watch-list repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::WatchedItemDbModel;
use crate::domain::{SourceKind, TrackedItem};
use crate::{Error, Result};

/// Watch-list repository trait.
#[async_trait]
pub trait WatchListRepository: Send + Sync {
    /// Items of one source kind, in insertion order.
    async fn list_items(&self, kind: SourceKind) -> Result<Vec<TrackedItem>>;
    async fn list_all(&self) -> Result<Vec<TrackedItem>>;
    /// Fails with [`Error::Conflict`] if the item is already watched.
    async fn add(&self, item: &TrackedItem) -> Result<()>;
    /// Fails with [`Error::NotFound`] if the item is not watched. The item's
    /// stored version is removed along with it.
    async fn remove(&self, item: &TrackedItem) -> Result<()>;
}

/// SQLx implementation of WatchListRepository.
pub struct SqlxWatchListRepository {
    pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqlxWatchListRepository {
    pub fn new(pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self { pool, write_pool }
    }
}

fn to_items(rows: Vec<WatchedItemDbModel>) -> Result<Vec<TrackedItem>> {
    rows.iter().map(WatchedItemDbModel::to_tracked_item).collect()
}

#[async_trait]
impl WatchListRepository for SqlxWatchListRepository {
    async fn list_items(&self, kind: SourceKind) -> Result<Vec<TrackedItem>> {
        let rows = sqlx::query_as::<_, WatchedItemDbModel>(
            "SELECT * FROM watched_items WHERE source_kind = ? ORDER BY created_at, identifier",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        to_items(rows)
    }

    async fn list_all(&self) -> Result<Vec<TrackedItem>> {
        let rows = sqlx::query_as::<_, WatchedItemDbModel>(
            "SELECT * FROM watched_items ORDER BY source_kind, created_at, identifier",
        )
        .fetch_all(&self.pool)
        .await?;
        to_items(rows)
    }

    async fn add(&self, item: &TrackedItem) -> Result<()> {
        let model = WatchedItemDbModel::new(item);
        let result = sqlx::query(
            r#"
            INSERT INTO watched_items (source_kind, identifier, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (source_kind, identifier) DO NOTHING
            "#,
        )
        .bind(&model.source_kind)
        .bind(&model.identifier)
        .bind(model.created_at)
        .execute(&self.write_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::conflict("watched item", item.to_string()));
        }
        Ok(())
    }

    async fn remove(&self, item: &TrackedItem) -> Result<()> {
        let mut tx = self.write_pool.begin().await?;

        let result =
            sqlx::query("DELETE FROM watched_items WHERE source_kind = ? AND identifier = ?")
                .bind(item.source_kind.as_str())
                .bind(&item.identifier)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(Error::not_found("watched item", item.to_string()));
        }

        sqlx::query("DELETE FROM versions WHERE source_kind = ? AND identifier = ?")
            .bind(item.source_kind.as_str())
            .bind(&item.identifier)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
