use std::sync::Arc;

use ob_aggregator::aggregator::pb::orderbook_aggregator_server::OrderbookAggregatorServer;
use ob_aggregator::aggregator::AggregatorService;
use ob_aggregator::cli::Cli;
use ob_aggregator::config::Config;
use ob_aggregator::feed::{binance, bitstamp, run_feed};
use ob_aggregator::metrics::VenueMetrics;
use ob_aggregator::state::SharedState;
use ob_aggregator::{init_logging, AppResult};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();
    init_logging(&cli.log_level)?;

    let config = Config::from_cli(&cli)?;

    tracing::info!(
        "starting order book aggregator for {}/{}",
        config.base_asset,
        config.quote_asset
    );

    let state = SharedState::new();

    let binance_metrics = Arc::new(VenueMetrics::new("binance"));
    let bitstamp_metrics = Arc::new(VenueMetrics::new("bitstamp"));

    let binance_feed = binance::BinanceFeed::new(
        &config.base_asset,
        &config.quote_asset,
        state.clone(),
        binance_metrics,
    );
    let binance_url = binance::ws_url(&config.base_asset, &config.quote_asset);
    tokio::spawn(async move { run_feed(&binance_url, "binance", binance_feed).await });

    let bitstamp_feed = bitstamp::BitstampFeed::new(
        &config.base_asset,
        &config.quote_asset,
        state.clone(),
        bitstamp_metrics,
    );
    tokio::spawn(async move { run_feed(bitstamp::ws_url(), "bitstamp", bitstamp_feed).await });

    let addr = format!("[::]:{}", config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;

    let service = AggregatorService::new(state, config.levels, config.dust_amount);

    tracing::info!("gRPC server listening on {addr}");

    tonic::transport::Server::builder()
        .add_service(OrderbookAggregatorServer::new(service))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("gRPC server error: {e}"))?;

    Ok(())
}
