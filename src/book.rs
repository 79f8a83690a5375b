//! Price-indexed bid/ask container with ordered iteration and top-K extraction.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// One side of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bids,
    Asks,
}

/// Index out of range for [`SortedBook::index`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("index {index} out of range (len {len})")]
pub struct OutOfRange {
    pub index: usize,
    pub len: usize,
}

/// A single price level.
pub type Level = (Decimal, Decimal);

/// A price-indexed book for one side of one venue.
///
/// Backed by a `BTreeMap` keyed on price, so every insert/remove is
/// logarithmic and traversal is always in sorted key order. Asks iterate
/// ascending (the map's natural order); bids iterate descending (reversed
/// iteration over the same map) — no separate negated key or second map is
/// needed because `Decimal` is `Ord`.
#[derive(Debug, Clone, Default)]
pub struct SortedBook {
    side: Option<Side>,
    levels: BTreeMap<Decimal, Decimal>,
}

impl SortedBook {
    pub fn new(side: Side) -> Self {
        Self {
            side: Some(side),
            levels: BTreeMap::new(),
        }
    }

    /// Insert or overwrite a level. `size == 0` deletes the level instead.
    pub fn upsert(&mut self, price: Decimal, size: Decimal) {
        if size.is_zero() {
            self.remove(price);
        } else {
            self.levels.insert(price, size);
        }
    }

    /// Remove a level if present; a no-op otherwise.
    pub fn remove(&mut self, price: Decimal) {
        self.levels.remove(&price);
    }

    /// Replace the entire side with a fresh set of levels (Bitstamp semantics).
    /// Levels with size <= 0 are dropped rather than inserted.
    pub fn replace_all(&mut self, levels: impl IntoIterator<Item = Level>) {
        self.levels.clear();
        for (price, size) in levels {
            if size > Decimal::ZERO {
                self.levels.insert(price, size);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    fn ordered(&self) -> Box<dyn Iterator<Item = Level> + '_> {
        match self.side {
            Some(Side::Bids) => Box::new(self.levels.iter().rev().map(|(p, s)| (*p, *s))),
            _ => Box::new(self.levels.iter().map(|(p, s)| (*p, *s))),
        }
    }

    /// The i-th level in sort order (best-first).
    pub fn index(&self, i: usize) -> Result<Level, OutOfRange> {
        self.ordered().nth(i).ok_or(OutOfRange {
            index: i,
            len: self.len(),
        })
    }

    /// The first `min(k, len)` levels in sort order.
    pub fn top_k(&self, k: usize) -> Vec<Level> {
        self.ordered().take(k).collect()
    }

    /// All levels in sort order (used by tests and the dust-filter scan).
    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        self.ordered()
    }
}
