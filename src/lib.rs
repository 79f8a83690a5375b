//! Cross-exchange order book aggregator.
//!
//! Connects to Binance and Bitstamp, reconstructs each venue's local
//! top-of-book, and publishes a merged, change-driven view over a
//! streaming gRPC interface.

pub mod aggregator;
pub mod book;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod state;

use anyhow::Result;

/// Application result type for consistent error handling at the binary edge.
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize the tracing subscriber used by every module in this crate.
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ob_aggregator={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
