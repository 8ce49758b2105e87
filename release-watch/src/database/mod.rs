//! Database module for release-watch.
//!
//! Persistence layer on SQLite with sqlx: connection pools, migrations,
//! models and repositories for the watch list and the version store.

pub mod models;
pub mod repositories;
pub mod retry;
pub mod time;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, warn};

/// Database connection pool type alias.
pub type DbPool = Pool<Sqlite>;

/// Write pool; always a single connection.
pub type WritePool = Pool<Sqlite>;

const READ_POOL_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Which side of the read/write split a pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolRole {
    Read,
    Write,
}

impl PoolRole {
    fn max_connections(self) -> u32 {
        match self {
            Self::Read => READ_POOL_SIZE,
            Self::Write => 1,
        }
    }

    fn acquire_timeout(self) -> Duration {
        match self {
            Self::Read => Duration::from_secs(30),
            // Writers queue behind each other on the single connection.
            Self::Write => Duration::from_secs(60),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .pragma("temp_store", "MEMORY")
        .create_if_missing(true))
}

async fn journal_mode(conn: &mut SqliteConnection) -> Result<String, sqlx::Error> {
    sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(conn)
        .await
}

async fn open_pool(database_url: &str, role: PoolRole) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(role.max_connections())
        .acquire_timeout(role.acquire_timeout())
        .connect_with(connect_options(database_url)?)
        .await?;

    // In-memory databases report "memory" and cannot switch to WAL.
    let mut conn = pool.acquire().await?;
    let mode = journal_mode(&mut conn).await?;
    if mode != "wal" && mode != "memory" {
        warn!(pool = role.name(), mode = %mode, "Journal mode is not WAL, switching");
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&mut *conn)
            .await?;
    }
    drop(conn);

    info!(
        pool = role.name(),
        max_connections = role.max_connections(),
        "Database pool ready"
    );
    Ok(pool)
}

/// Open the read pool.
pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    open_pool(database_url, PoolRole::Read).await
}

/// Open the write pool. Every version upsert and watch-list mutation goes
/// through its one connection.
pub async fn init_write_pool(database_url: &str) -> Result<WritePool, sqlx::Error> {
    open_pool(database_url, PoolRole::Write).await
}

pub async fn run_migrations(pool: &DbPool) -> crate::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Read and write pools opened against the same database.
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
    pub write_pool: WritePool,
}

impl Database {
    /// Open both pools and apply migrations.
    pub async fn connect(database_url: &str) -> crate::Result<Self> {
        let write_pool = init_write_pool(database_url).await?;
        run_migrations(&write_pool).await?;
        let pool = init_pool(database_url).await?;
        Ok(Self { pool, write_pool })
    }

    /// A single-connection in-memory database shared by reads and writes.
    pub async fn in_memory() -> crate::Result<Self> {
        // The database lives only as long as its one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options("sqlite::memory:")?)
            .await?;
        run_migrations(&pool).await?;
        Ok(Self {
            write_pool: pool.clone(),
            pool,
        })
    }
}
