//! Shared State (C5): per-venue books plus a monotonic freshness marker.
//!
//! A single `tokio::sync::Mutex` guards both venue books. Writers (feed
//! tasks) hold it for the span of applying one inbound frame; readers (the
//! aggregator) hold it for the span of one top-K snapshot. A `Notify` wakes
//! the aggregator on every commit instead of polling, per the preferred
//! waiting discipline.

use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::book::{Side, SortedBook};

/// One venue's reconstructed book.
#[derive(Debug, Default)]
pub struct VenueBook {
    pub bids: SortedBook,
    pub asks: SortedBook,
}

impl VenueBook {
    fn new() -> Self {
        Self {
            bids: SortedBook::new(Side::Bids),
            asks: SortedBook::new(Side::Asks),
        }
    }
}

/// Named-field record for the two venues this process tracks, plus a
/// version counter bumped on every write. Explicit fields, not a
/// venue-tag-keyed map with a reserved sentinel key for the timestamp.
#[derive(Debug)]
pub struct Books {
    pub binance: VenueBook,
    pub bitstamp: VenueBook,
    pub version: u64,
}

impl Books {
    fn new() -> Self {
        Self {
            binance: VenueBook::new(),
            bitstamp: VenueBook::new(),
            version: 0,
        }
    }
}

/// Co-owned by every feed reconstructor (writer) and the aggregator (reader).
pub struct SharedState {
    books: Mutex<Books>,
    notify: Notify,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            books: Mutex::new(Books::new()),
            notify: Notify::new(),
        })
    }

    /// Run `f` with exclusive access, bump the version, and wake waiters.
    /// Used by feed tasks to apply one inbound frame's mutations atomically.
    pub async fn mutate(&self, f: impl FnOnce(&mut Books)) {
        let mut guard = self.books.lock().await;
        f(&mut guard);
        guard.version += 1;
        drop(guard);
        self.notify.notify_waiters();
    }

    /// Current version, for the aggregator's change-driven poll.
    pub async fn version(&self) -> u64 {
        self.books.lock().await.version
    }

    /// Run `f` with a stable read-only view (a consistent top-K snapshot).
    pub async fn read<T>(&self, f: impl FnOnce(&Books) -> T) -> T {
        let guard = self.books.lock().await;
        f(&guard)
    }

    /// Block until the version has advanced past `since`, returning the new
    /// version. Waits on `Notify` (woken by every writer commit) with a
    /// bounded poll fallback so a commit racing between the version check
    /// and the `notified()` registration is never missed.
    pub async fn wait_for_change(&self, since: u64) -> u64 {
        loop {
            let current = self.version().await;
            if current > since {
                return current;
            }
            let _ = tokio::time::timeout(std::time::Duration::from_millis(25), self.notify.notified()).await;
        }
    }
}
