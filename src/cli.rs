//! Command-line interface module.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "ob-aggregator")]
#[command(about = "Cross-exchange order book aggregator")]
#[command(long_about = "Reconstructs Binance and Bitstamp order books and publishes a merged top-of-book over a streaming gRPC interface.")]
#[command(version)]
pub struct Cli {
    /// Base asset of the trading pair (e.g. "btc")
    #[arg(long = "base_asset")]
    pub base_asset: String,

    /// Quote asset of the trading pair (e.g. "usdt")
    #[arg(long = "quote_asset")]
    pub quote_asset: String,

    /// Number of bid/ask levels to publish per side
    #[arg(long = "levels", default_value_t = 10)]
    pub levels: usize,

    /// Minimum size a level must have to be published; levels at or below
    /// this amount are filtered as dust
    #[arg(long = "dust_amount", default_value = "0")]
    pub dust_amount: String,

    /// gRPC server port
    #[arg(long = "port", default_value_t = 50052)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
