//! Aggregator / Publisher (C6): change-driven merge of per-venue tops into
//! a `Summary`, served over the `BookSummary` streaming RPC.

use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::book::SortedBook;
use crate::error::AggregatorError;
use crate::state::{Books, SharedState};

pub mod pb {
    tonic::include_proto!("orderbook");
}

use pb::{
    orderbook_aggregator_server::OrderbookAggregator, Empty, Level as PbLevel, Summary as PbSummary,
};

const BINANCE_TAG: &str = "Binance";
const BITSTAMP_TAG: &str = "Bitstamp";

/// Levels on one side after per-venue dust filtering, each tagged with its
/// originating venue, still unsorted across venues.
fn dust_filtered_top(book: &SortedBook, levels: usize, dust: Decimal) -> Vec<(Decimal, Decimal)> {
    // `.take(levels)` runs over the already-dust-filtered iterator, so dust
    // levels are skipped without consuming the level budget.
    book.iter().filter(|(_, size)| *size > dust).take(levels).collect()
}

fn tagged(tag: &'static str, levels: Vec<(Decimal, Decimal)>) -> Vec<(&'static str, Decimal, Decimal)> {
    levels.into_iter().map(|(p, s)| (tag, p, s)).collect()
}

fn to_pb_level((exchange, price, amount): (&'static str, Decimal, Decimal)) -> PbLevel {
    PbLevel {
        exchange: exchange.to_string(),
        price: price.to_string(),
        amount: amount.to_string(),
    }
}

/// Build one `Summary` frame from a consistent view of `Books`, or `None`
/// if either side is empty across all venues (the `EmptyBookSide` case,
/// which suppresses emission rather than publishing an undefined spread).
pub fn build_summary(books: &Books, levels: usize, dust: Decimal) -> Option<PbSummary> {
    let mut bids = tagged(BINANCE_TAG, dust_filtered_top(&books.binance.bids, levels, dust));
    bids.extend(tagged(BITSTAMP_TAG, dust_filtered_top(&books.bitstamp.bids, levels, dust)));

    let mut asks = tagged(BINANCE_TAG, dust_filtered_top(&books.binance.asks, levels, dust));
    asks.extend(tagged(BITSTAMP_TAG, dust_filtered_top(&books.bitstamp.asks, levels, dust)));

    bids.sort_by(|a, b| b.1.cmp(&a.1));
    asks.sort_by(|a, b| a.1.cmp(&b.1));
    bids.truncate(levels);
    asks.truncate(levels);

    if bids.is_empty() || asks.is_empty() {
        warn!("{}", AggregatorError::EmptyBookSide);
        return None;
    }

    let spread = (asks[0].1 - bids[0].1).to_string();

    Some(PbSummary {
        spread,
        bids: bids.into_iter().map(to_pb_level).collect(),
        asks: asks.into_iter().map(to_pb_level).collect(),
    })
}

pub struct AggregatorService {
    state: Arc<SharedState>,
    levels: usize,
    dust_amount: Decimal,
}

impl AggregatorService {
    pub fn new(state: Arc<SharedState>, levels: usize, dust_amount: Decimal) -> Self {
        Self {
            state,
            levels,
            dust_amount,
        }
    }
}

type SummaryStream = Pin<Box<dyn Stream<Item = Result<PbSummary, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl OrderbookAggregator for AggregatorService {
    type BookSummaryStream = SummaryStream;

    async fn book_summary(&self, _request: Request<Empty>) -> Result<Response<Self::BookSummaryStream>, Status> {
        let state = self.state.clone();
        let levels = self.levels;
        let dust_amount = self.dust_amount;

        let (tx, rx) = tokio::sync::mpsc::channel(16);

        tokio::spawn(async move {
            let mut last_transmitted = 0u64;
            loop {
                let current = state.wait_for_change(last_transmitted).await;
                last_transmitted = current;

                let summary = state.read(|books| build_summary(books, levels, dust_amount)).await;

                let Some(summary) = summary else {
                    continue;
                };

                if tx.send(Ok(summary)).await.is_err() {
                    warn!("{}", AggregatorError::RpcClientGone);
                    break;
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx)) as SummaryStream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Side;
    use crate::state::VenueBook;
    use rust_decimal_macros::dec;

    fn books_with(
        binance_bids: Vec<(Decimal, Decimal)>,
        binance_asks: Vec<(Decimal, Decimal)>,
        bitstamp_bids: Vec<(Decimal, Decimal)>,
        bitstamp_asks: Vec<(Decimal, Decimal)>,
    ) -> Books {
        let mut binance = VenueBook::default();
        binance.bids = SortedBook::new(Side::Bids);
        binance.asks = SortedBook::new(Side::Asks);
        for (p, s) in binance_bids {
            binance.bids.upsert(p, s);
        }
        for (p, s) in binance_asks {
            binance.asks.upsert(p, s);
        }

        let mut bitstamp = VenueBook::default();
        bitstamp.bids = SortedBook::new(Side::Bids);
        bitstamp.asks = SortedBook::new(Side::Asks);
        for (p, s) in bitstamp_bids {
            bitstamp.bids.upsert(p, s);
        }
        for (p, s) in bitstamp_asks {
            bitstamp.asks.upsert(p, s);
        }

        Books { binance, bitstamp, version: 1 }
    }

    #[test]
    fn s5_aggregation_merge_picks_best_across_venues() {
        let books = books_with(
            vec![(dec!(101), dec!(1))],
            vec![(dec!(102), dec!(1))],
            vec![(dec!(100.5), dec!(2))],
            vec![(dec!(101.8), dec!(2))],
        );

        let summary = build_summary(&books, 1, Decimal::ZERO).unwrap();
        assert_eq!(summary.bids[0].exchange, "Binance");
        assert_eq!(summary.bids[0].price, "101");
        assert_eq!(summary.asks[0].exchange, "Bitstamp");
        assert_eq!(summary.asks[0].price, "101.8");
        assert_eq!(summary.spread, "0.8");
    }

    #[test]
    fn s6_dust_filter_skips_without_consuming_budget() {
        let books = books_with(
            vec![(dec!(100), dec!(1)), (dec!(99), dec!(0.4)), (dec!(98), dec!(0.6))],
            vec![],
            vec![],
            vec![(dec!(1), dec!(1))],
        );

        let summary = build_summary(&books, 2, dec!(0.5)).unwrap();
        let prices: Vec<&str> = summary.bids.iter().map(|l| l.price.as_str()).collect();
        assert_eq!(prices, vec!["100", "98"]);
    }

    #[test]
    fn empty_side_suppresses_emission() {
        let books = books_with(vec![(dec!(100), dec!(1))], vec![], vec![], vec![]);
        assert!(build_summary(&books, 10, Decimal::ZERO).is_none());
    }

    #[test]
    fn invariant6_published_tops_are_the_max_min_across_venues() {
        let books = books_with(
            vec![(dec!(50), dec!(1))],
            vec![(dec!(60), dec!(1))],
            vec![(dec!(55), dec!(1))],
            vec![(dec!(58), dec!(1))],
        );
        let summary = build_summary(&books, 10, Decimal::ZERO).unwrap();
        assert_eq!(summary.bids[0].price, "55");
        assert_eq!(summary.asks[0].price, "58");
        assert_eq!(summary.spread, "3");
    }
}
