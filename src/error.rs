//! Error taxonomy shared across feed reconstructors and the aggregator.

/// Errors recoverable without ever terminating the process.
///
/// Every variant here maps to a row in the error-handling table: each is
/// logged at the call site and handled locally (dropped frame, reconnect,
/// retry, or resync) rather than propagated to an RPC client.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("snapshot fetch exhausted retries: {0}")]
    Snapshot(String),

    #[error("binance book out of sync (gap before id {expected})")]
    OutOfSync { expected: u64 },

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("aggregator sees an empty book side")]
    EmptyBookSide,

    #[error("rpc subscriber gone")]
    RpcClientGone,
}
