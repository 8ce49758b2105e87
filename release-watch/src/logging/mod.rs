//! Logging setup.
//!
//! Console output always; a daily-rolling file when a log directory is
//! configured. Timestamps use the local timezone.

use chrono::{Local, Utc};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "release_watch=info,sqlx=warn";

/// Prefix of rolled log files, e.g. `release-watch.log.2025-01-31`.
const LOG_FILE_PREFIX: &str = "release-watch.log";

/// Log retention period in days.
const LOG_RETENTION_DAYS: i64 = 7;

/// Formats timestamps in the server's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. When `log_dir` is given the
/// returned guard must be kept alive for the file writer to flush.
pub fn init_logging(log_dir: Option<&Path>) -> crate::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(guard)
}

/// Delete rolled log files older than `LOG_RETENTION_DAYS`, once a day.
pub fn start_retention_cleanup(log_dir: &Path, cancel_token: CancellationToken) {
    let log_dir = log_dir.to_path_buf();

    tokio::spawn(async move {
        let cleanup_interval = Duration::from_secs(24 * 60 * 60);

        loop {
            if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS).await {
                warn!(error = %e, "Failed to cleanup old logs");
            }
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Log retention cleanup task shutting down");
                    break;
                }
                _ = tokio::time::sleep(cleanup_interval) => {}
            }
        }
    });
}

/// Delete log files older than the specified number of days.
async fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    let cutoff = (Utc::now() - chrono::Duration::days(retention_days)).date_naive();

    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut deleted_count = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(date_str) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(LOG_FILE_PREFIX))
            .and_then(|n| n.strip_prefix('.'))
        else {
            continue;
        };

        let Ok(file_date) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };

        if file_date < cutoff {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    deleted_count += 1;
                    debug!(path = %path.display(), "Deleted old log file");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old log file"),
            }
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "Cleaned up old log files");
    }

    Ok(deleted_count)
}
