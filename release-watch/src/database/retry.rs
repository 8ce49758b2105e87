//! Retry of write statements while SQLite reports the database busy.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

const MAX_RETRIES: usize = 8;
const BASE_DELAY_MS: u64 = 10;
const MAX_DELAY_MS: u64 = 1000;

/// SQLITE_BUSY and SQLITE_LOCKED primary result codes.
const BUSY_CODES: [&str; 2] = ["5", "6"];

fn mentions_lock(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("database is locked") || message.contains("database is busy")
}

fn is_busy(err: &Error) -> bool {
    match err {
        Error::DatabaseSqlx(sqlx::Error::Database(db_err)) => {
            db_err
                .code()
                .is_some_and(|code| BUSY_CODES.contains(&code.as_ref()))
                || mentions_lock(db_err.message())
        }
        Error::DatabaseSqlx(other) => mentions_lock(&other.to_string()),
        _ => false,
    }
}

/// Exponential backoff capped at `MAX_DELAY_MS`, plus up to 25% jitter.
fn backoff_delay(attempt: usize) -> Duration {
    let base = BASE_DELAY_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(MAX_DELAY_MS);
    let jitter = rand::random::<u64>() % (base / 4 + 1);
    Duration::from_millis((base + jitter).min(MAX_DELAY_MS))
}

/// Run `op`, retrying while SQLite reports busy. Other errors return at once.
pub async fn retry_on_sqlite_busy<T, F, Fut>(op_name: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if attempt < MAX_RETRIES && is_busy(&err) => {
                let delay = backoff_delay(attempt);
                attempt += 1;
                debug!(op = op_name, attempt, ?delay, "SQLite busy, retrying");
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}
