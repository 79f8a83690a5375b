//! Lightweight per-venue connection metrics.
//!
//! Trimmed down from the teacher crate's `MetricsCollector` to the counters
//! this server actually reports: there is no TUI here to feed FPS/refresh
//! fields to, so only the connection-health counters survive.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct VenueMetrics {
    name: &'static str,
    updates_applied: AtomicU64,
    reconnects: AtomicU64,
    out_of_sync_events: AtomicU64,
}

impl VenueMetrics {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn record_update(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out_of_sync(&self) {
        self.out_of_sync_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> VenueMetricsSnapshot {
        VenueMetricsSnapshot {
            name: self.name,
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            out_of_sync_events: self.out_of_sync_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VenueMetricsSnapshot {
    pub name: &'static str,
    pub updates_applied: u64,
    pub reconnects: u64,
    pub out_of_sync_events: u64,
}

impl std::fmt::Display for VenueMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: updates={} reconnects={} out_of_sync={}",
            self.name, self.updates_applied, self.reconnects, self.out_of_sync_events
        )
    }
}
