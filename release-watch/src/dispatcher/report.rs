//! Outcome of one polling cycle.

use tracing::{info, warn};

use crate::domain::{ReleaseEvent, TrackedItem};
use crate::fetcher::FetchError;
use crate::notification::SendError;

/// Result of delivering one event to one channel.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: &'static str,
    pub item: TrackedItem,
    pub version_marker: String,
    pub result: Result<(), SendError>,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything that happened during a cycle, failures included.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub items_polled: usize,
    pub fetch_failures: Vec<(TrackedItem, FetchError)>,
    pub detection_failures: Vec<(TrackedItem, String)>,
    pub events: Vec<ReleaseEvent>,
    pub deliveries: Vec<Delivery>,
}

impl CycleReport {
    /// Number of successful deliveries.
    pub fn sent_count(&self) -> usize {
        self.deliveries.iter().filter(|d| d.is_sent()).count()
    }

    pub fn failed_deliveries(&self) -> Vec<&Delivery> {
        self.deliveries.iter().filter(|d| !d.is_sent()).collect()
    }

    /// Deliveries made for `item`, in completion order.
    pub fn deliveries_for<'a>(&'a self, item: &'a TrackedItem) -> impl Iterator<Item = &'a Delivery> {
        self.deliveries.iter().filter(move |d| &d.item == item)
    }

    pub fn is_clean(&self) -> bool {
        self.fetch_failures.is_empty()
            && self.detection_failures.is_empty()
            && self.deliveries.iter().all(Delivery::is_sent)
    }

    pub fn log_summary(&self) {
        let failed = self.deliveries.len() - self.sent_count();
        if self.is_clean() {
            info!(
                items = self.items_polled,
                events = self.events.len(),
                sent = self.sent_count(),
                "Cycle completed"
            );
        } else {
            warn!(
                items = self.items_polled,
                events = self.events.len(),
                sent = self.sent_count(),
                failed_sends = failed,
                fetch_failures = self.fetch_failures.len(),
                detection_failures = self.detection_failures.len(),
                "Cycle completed with failures"
            );
        }
    }
}
