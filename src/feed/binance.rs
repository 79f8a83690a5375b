//! Binance Reconstructor (C3): snapshot+diff state machine.
//!
//! Implements the canonical Binance local-book algorithm: buffer the live
//! diff stream, bootstrap from a REST depth snapshot on the first message,
//! then gate every subsequent diff against `last_update_id` so only
//! causally-ordered updates are applied.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, error, warn};

use crate::book::{Side, SortedBook};
use crate::error::AggregatorError;
use crate::feed::FeedHandler;
use crate::metrics::VenueMetrics;
use crate::state::SharedState;

const BINANCE_WS_BASE: &str = "wss://stream.binance.com:9443/ws";
const BINANCE_REST_BASE: &str = "https://www.binance.com/api/v1/depth";
const SNAPSHOT_DEPTH_LIMIT: u32 = 100;

pub fn ws_url(base_asset: &str, quote_asset: &str) -> String {
    format!(
        "{BINANCE_WS_BASE}/{}{}@depth@100ms",
        base_asset.to_lowercase(),
        quote_asset.to_lowercase()
    )
}

#[derive(Debug, Deserialize)]
struct DepthSnapshot {
    #[serde(rename = "lastUpdateId")]
    last_update_id: u64,
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct DepthDiff {
    #[serde(rename = "U")]
    first_update_id: u64,
    #[serde(rename = "u")]
    final_update_id: u64,
    #[serde(rename = "b")]
    bids: Vec<[String; 2]>,
    #[serde(rename = "a")]
    asks: Vec<[String; 2]>,
}

fn parse_level(raw: &[String; 2]) -> Option<(Decimal, Decimal)> {
    let price = Decimal::from_str(&raw[0]).ok()?;
    let size = Decimal::from_str(&raw[1]).ok()?;
    Some((price, size))
}

/// Fetches a REST depth snapshot, retrying up to 3 times with exponential
/// backoff on transport errors. A final failure surfaces `SnapshotError`;
/// the caller drops the current frame and waits for the next live message
/// to retry bootstrap.
async fn fetch_snapshot(
    client: &reqwest::Client,
    rest_base: &str,
    symbol: &str,
) -> Result<DepthSnapshot, AggregatorError> {
    let backoff = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::from_secs(10)))
        .build();

    let url = format!("{rest_base}?symbol={symbol}&limit={SNAPSHOT_DEPTH_LIMIT}");
    let client = client.clone();

    let fetch = || async {
        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(AggregatorError::Transport(e.to_string())))?;

        if !resp.status().is_success() {
            return Err(backoff::Error::transient(AggregatorError::Transport(
                format!("snapshot HTTP status {}", resp.status()),
            )));
        }

        resp.json::<DepthSnapshot>()
            .await
            .map_err(|e| backoff::Error::transient(AggregatorError::Transport(e.to_string())))
    };

    backoff::future::retry(backoff, fetch)
        .await
        .map_err(|e| AggregatorError::Snapshot(e.to_string()))
}

/// Per-connection Binance state. `last_update_id` and
/// `initial_update_pending` are thread/task-local — they are never placed
/// in `SharedState`, per the "no shared mutable state outside the lock"
/// rule.
pub struct BinanceFeed {
    symbol: String,
    state: Arc<SharedState>,
    client: reqwest::Client,
    rest_base: String,
    metrics: Arc<VenueMetrics>,
    last_update_id: u64,
    initial_update_pending: bool,
    bootstrapped: bool,
}

impl BinanceFeed {
    pub fn new(base_asset: &str, quote_asset: &str, state: Arc<SharedState>, metrics: Arc<VenueMetrics>) -> Self {
        Self {
            symbol: format!("{}{}", base_asset.to_uppercase(), quote_asset.to_uppercase()),
            state,
            client: reqwest::Client::new(),
            rest_base: BINANCE_REST_BASE.to_string(),
            metrics,
            last_update_id: 0,
            initial_update_pending: true,
            bootstrapped: false,
        }
    }

    /// Points the REST snapshot fetch at an arbitrary base URL, for tests
    /// that stand up a local mock server in place of the live endpoint.
    pub fn with_rest_base(mut self, rest_base: impl Into<String>) -> Self {
        self.rest_base = rest_base.into();
        self
    }

    /// Clears local and shared Binance state and re-enters bootstrap. This
    /// is the implementation's resolution of the `OutOfSync` open question:
    /// resync rather than leaving the book permanently inconsistent.
    async fn resync(&mut self) {
        warn!("binance: clearing book and re-bootstrapping after out-of-sync");
        self.bootstrapped = false;
        self.last_update_id = 0;
        self.initial_update_pending = true;
        self.state
            .mutate(|books| {
                books.binance.bids = SortedBook::new(Side::Bids);
                books.binance.asks = SortedBook::new(Side::Asks);
            })
            .await;
    }

    async fn bootstrap(&mut self) -> Result<(), AggregatorError> {
        let snapshot = fetch_snapshot(&self.client, &self.rest_base, &self.symbol).await?;
        self.last_update_id = snapshot.last_update_id;

        self.state
            .mutate(|books| {
                books.binance.bids.replace_all(
                    snapshot
                        .bids
                        .iter()
                        .filter_map(parse_level),
                );
                books.binance.asks.replace_all(
                    snapshot
                        .asks
                        .iter()
                        .filter_map(parse_level),
                );
            })
            .await;

        self.bootstrapped = true;
        debug!("binance: bootstrapped at last_update_id={}", self.last_update_id);
        Ok(())
    }

    async fn apply_diff(&mut self, diff: DepthDiff) {
        let gate_ok = (diff.first_update_id <= self.last_update_id + 1
            && self.last_update_id + 1 <= diff.final_update_id)
            || diff.first_update_id == self.last_update_id + 1;

        if !gate_ok {
            if self.initial_update_pending {
                self.initial_update_pending = false;
                debug!("binance: dropping pre-bootstrap straddling update");
            } else {
                let err = AggregatorError::OutOfSync {
                    expected: self.last_update_id + 1,
                };
                error!("binance: {err}");
                self.metrics.record_out_of_sync();
                self.resync().await;
            }
            return;
        }

        self.initial_update_pending = false;
        self.last_update_id = diff.final_update_id;

        self.state
            .mutate(|books| {
                for (price, size) in diff.bids.iter().filter_map(parse_level) {
                    books.binance.bids.upsert(price, size);
                }
                for (price, size) in diff.asks.iter().filter_map(parse_level) {
                    books.binance.asks.upsert(price, size);
                }
            })
            .await;

        self.metrics.record_update();
    }
}

#[async_trait::async_trait]
impl FeedHandler for BinanceFeed {
    async fn on_message(&mut self, frame: &str) {
        if !self.bootstrapped {
            if let Err(e) = self.bootstrap().await {
                warn!("binance: {e}");
                return;
            }
        }

        match serde_json::from_str::<DepthDiff>(frame) {
            Ok(diff) => self.apply_diff(diff).await,
            Err(e) => warn!("binance: {}", AggregatorError::MalformedFrame(e.to_string())),
        }
    }

    fn on_error(&mut self, err: &str) {
        self.metrics.record_reconnect();
        warn!("binance: transport error: {err}");
    }

    fn on_close(&mut self) {
        self.metrics.record_reconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::VenueMetrics;
    use rust_decimal_macros::dec;

    fn feed() -> BinanceFeed {
        BinanceFeed::new("BTC", "USDT", SharedState::new(), Arc::new(VenueMetrics::new("binance")))
    }

    fn diff(u_first: u64, u_final: u64) -> DepthDiff {
        DepthDiff {
            first_update_id: u_first,
            final_update_id: u_final,
            bids: vec![],
            asks: vec![],
        }
    }

    #[test]
    fn ws_url_lowercases_and_joins() {
        assert_eq!(
            ws_url("BTC", "USDT"),
            "wss://stream.binance.com:9443/ws/btcusdt@depth@100ms"
        );
    }

    #[tokio::test]
    async fn s4_bootstrap_race_then_gap_then_resync() {
        let mut f = feed();
        f.bootstrapped = true;
        f.last_update_id = 100;

        // Straddling diff before bootstrap id: silently dropped, flag clears.
        f.apply_diff(diff(95, 99)).await;
        assert!(!f.initial_update_pending);
        assert_eq!(f.last_update_id, 100);

        // Contiguous diff: accepted.
        f.apply_diff(diff(101, 105)).await;
        assert_eq!(f.last_update_id, 105);

        // Gap at 106: dropped, triggers resync (book cleared, bootstrapped=false).
        f.apply_diff(diff(107, 110)).await;
        assert!(!f.bootstrapped);
        assert_eq!(f.last_update_id, 0);
        assert!(f.initial_update_pending);
    }

    #[tokio::test]
    async fn gate_accepts_straddling_and_contiguous_updates() {
        let mut f = feed();
        f.bootstrapped = true;
        f.last_update_id = 50;
        f.initial_update_pending = false;

        // Straddle: U <= last+1 <= u
        f.apply_diff(diff(48, 55)).await;
        assert_eq!(f.last_update_id, 55);

        // Contiguous: U == last+1
        f.apply_diff(diff(56, 60)).await;
        assert_eq!(f.last_update_id, 60);
    }

    #[tokio::test]
    async fn applied_bid_ask_updates_land_in_shared_state() {
        let mut f = feed();
        f.bootstrapped = true;
        f.last_update_id = 10;
        f.initial_update_pending = false;

        let mut d = diff(11, 11);
        d.bids = vec![["100".into(), "1.5".into()]];
        d.asks = vec![["101".into(), "2.5".into()]];
        f.apply_diff(d).await;

        let state = f.state.clone();
        state
            .read(|books| {
                assert_eq!(books.binance.bids.index(0).unwrap(), (dec!(100), dec!(1.5)));
                assert_eq!(books.binance.asks.index(0).unwrap(), (dec!(101), dec!(2.5)));
            })
            .await;
    }
}
