//! Bitstamp Reconstructor (C4): each message is an authoritative snapshot.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::AggregatorError;
use crate::feed::{FeedHandler, FeedSender};
use crate::metrics::VenueMetrics;
use crate::state::SharedState;

const BITSTAMP_URL: &str = "wss://ws.bitstamp.net";

pub fn ws_url() -> &'static str {
    BITSTAMP_URL
}

fn subscription_payload(base_asset: &str, quote_asset: &str) -> String {
    let pair = format!("{}{}", base_asset, quote_asset).to_lowercase();
    serde_json::json!({
        "event": "bts:subscribe",
        "data": { "channel": format!("order_book_{pair}") }
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct BookData {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum FeedMessage {
    #[serde(rename = "bts:subscription_succeeded")]
    SubscriptionSucceeded,
    #[serde(rename = "bts:error")]
    Error { message: Option<String> },
    Data { data: BookData },
    #[serde(other)]
    Other,
}

fn parse_level(raw: &[String; 2]) -> Option<(Decimal, Decimal)> {
    let price = Decimal::from_str(&raw[0]).ok()?;
    let size = Decimal::from_str(&raw[1]).ok()?;
    Some((price, size))
}

pub struct BitstampFeed {
    base_asset: String,
    quote_asset: String,
    state: Arc<SharedState>,
    metrics: Arc<VenueMetrics>,
}

impl BitstampFeed {
    pub fn new(base_asset: &str, quote_asset: &str, state: Arc<SharedState>, metrics: Arc<VenueMetrics>) -> Self {
        Self {
            base_asset: base_asset.to_string(),
            quote_asset: quote_asset.to_string(),
            state,
            metrics,
        }
    }
}

#[async_trait::async_trait]
impl FeedHandler for BitstampFeed {
    async fn on_open(&mut self, send: &mut FeedSender<'_>) {
        send.send_text(subscription_payload(&self.base_asset, &self.quote_asset))
            .await;
    }

    async fn on_message(&mut self, frame: &str) {
        match serde_json::from_str::<FeedMessage>(frame) {
            Ok(FeedMessage::Data { data }) => {
                self.state
                    .mutate(|books| {
                        books.bitstamp.bids.replace_all(data.bids.iter().filter_map(parse_level));
                        books.bitstamp.asks.replace_all(data.asks.iter().filter_map(parse_level));
                    })
                    .await;
                self.metrics.record_update();
            }
            Ok(FeedMessage::SubscriptionSucceeded) => debug!("bitstamp: subscription confirmed"),
            Ok(FeedMessage::Error { message }) => {
                warn!("bitstamp: venue error: {:?}", message);
            }
            Ok(FeedMessage::Other) => {}
            Err(e) => warn!("bitstamp: {}", AggregatorError::MalformedFrame(e.to_string())),
        }
    }

    fn on_error(&mut self, err: &str) {
        self.metrics.record_reconnect();
        warn!("bitstamp: transport error: {err}");
    }

    fn on_close(&mut self) {
        self.metrics.record_reconnect();
    }
}
