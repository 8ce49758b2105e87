//! The polling loop.
//!
//! Each cycle lists the watch list, fetches every item with bounded
//! concurrency, runs change detection item by item and then fans each event
//! out to every channel that accepts its kind. Failures stay local to one
//! item or one channel and end up in the [`CycleReport`].

mod report;

pub use report::{CycleReport, Delivery};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::database::repositories::{VersionRepository, WatchListRepository};
use crate::detector::ChangeDetector;
use crate::domain::{ReleaseEvent, SourceKind};
use crate::fetcher::ReleaseFetcher;
use crate::notification::{NotificationChannel, SendError};

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Upper bound on concurrent fetches within a cycle.
    pub max_concurrent_fetches: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3600),
            max_concurrent_fetches: 8,
        }
    }
}

pub struct Dispatcher<W, V>
where
    W: WatchListRepository + ?Sized + 'static,
    V: VersionRepository + ?Sized + 'static,
{
    watch_list: Arc<W>,
    detector: ChangeDetector<V>,
    fetcher: Arc<dyn ReleaseFetcher>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    config: DispatcherConfig,
}

impl<W, V> Dispatcher<W, V>
where
    W: WatchListRepository + ?Sized + 'static,
    V: VersionRepository + ?Sized + 'static,
{
    pub fn new(
        watch_list: Arc<W>,
        detector: ChangeDetector<V>,
        fetcher: Arc<dyn ReleaseFetcher>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            watch_list,
            detector,
            fetcher,
            channels,
            config,
        }
    }

    pub fn channels(&self) -> &[Arc<dyn NotificationChannel>] {
        &self.channels
    }

    /// Run one full cycle.
    ///
    /// Only a watch-list listing failure fails the cycle as a whole.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let mut items = Vec::new();
        for kind in SourceKind::ALL {
            items.extend(self.watch_list.list_items(kind).await?);
        }
        report.items_polled = items.len();
        debug!(items = items.len(), "Polling watch list");

        let limit = self.config.max_concurrent_fetches.max(1);
        let fetched: Vec<_> = stream::iter(items)
            .map(|item| {
                let fetcher = self.fetcher.clone();
                async move {
                    let result = fetcher.fetch_latest(&item).await;
                    (item, result)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        // Detection completes for every item before any send starts.
        for (item, result) in fetched {
            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(item = %item, error = %e, "Fetch failed");
                    report.fetch_failures.push((item, e));
                    continue;
                }
            };

            match self.detector.detect(snapshot).await {
                Ok(Some(event)) => report.events.push(event),
                Ok(None) => {}
                Err(e) => {
                    error!(item = %item, error = %e, "Change detection failed");
                    report.detection_failures.push((item, e.to_string()));
                }
            }
        }

        report.deliveries = self.dispatch(&report.events).await;
        Ok(report)
    }

    /// Send every event to every channel that supports it, one task per pair.
    async fn dispatch(&self, events: &[ReleaseEvent]) -> Vec<Delivery> {
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();

        for event in events {
            let event = Arc::new(event.clone());
            for channel in &self.channels {
                if !channel.supports(event.source_kind()) {
                    continue;
                }
                let name = channel.channel_type();
                let channel = channel.clone();
                let task_event = event.clone();
                let handle = tasks.spawn(async move {
                    let payload = channel.format(&task_event);
                    channel.send(&payload).await
                });
                pending.insert(
                    handle.id(),
                    (name, event.item.clone(), event.version_marker.clone()),
                );
            }
        }

        let mut deliveries = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, Ok(result)),
                Err(e) => (e.id(), Err(e)),
            };
            let Some((channel, item, version_marker)) = pending.remove(&id) else {
                continue;
            };
            let result = result.unwrap_or_else(|join_error| {
                Err(SendError::Transport {
                    channel,
                    message: format!("send task failed: {join_error}"),
                })
            });

            match &result {
                Ok(()) => info!(channel, item = %item, marker = %version_marker, "Notification sent"),
                Err(e) => warn!(
                    channel,
                    item = %item,
                    status = ?e.status(),
                    error = %e,
                    "Notification failed"
                ),
            }
            deliveries.push(Delivery {
                channel,
                item,
                version_marker,
                result,
            });
        }
        deliveries
    }

    /// Poll until `cancel_token` is cancelled.
    ///
    /// A running cycle is completed; only the sleep between cycles is cut short.
    pub async fn run(&self, cancel_token: CancellationToken) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            channels = self.channels.len(),
            "Dispatcher started"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) => report.log_summary(),
                Err(e) => error!(error = %e, "Cycle skipped, watch list unavailable"),
            }

            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Dispatcher stopped");
    }
}
