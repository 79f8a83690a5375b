//! Feed Client base (C2): a long-lived streaming connection to one venue.
//!
//! Rather than deriving venue clients from a shared websocket base class,
//! this is a handler interface (`FeedHandler`) plus one `run_feed` driver
//! that owns the connect/reconnect loop and dispatches frames to whichever
//! handler it was given. Venue-specific logic (Binance's snapshot+diff
//! state machine, Bitstamp's snapshot replacement) lives entirely in the
//! handler implementation, not in the driver.

pub mod binance;
pub mod bitstamp;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{error, info, warn};

/// Venue-specific message handling, composed with the shared connect/
/// reconnect driver below instead of being baked into a base class.
#[async_trait::async_trait]
pub trait FeedHandler: Send {
    /// Called once per successful connection. Send any subscription
    /// payload the venue requires here (a venue that needs resubscription
    /// after a reconnect gets it for free, since `on_open` runs again).
    async fn on_open(&mut self, _send: &mut FeedSender) {}

    /// Called for every text frame received. Implementations should log
    /// and drop malformed/unrecognized frames rather than erroring the
    /// whole connection.
    async fn on_message(&mut self, frame: &str);

    /// Called when the underlying socket reports a transport error. The
    /// driver reconnects regardless; this is purely for logging/metrics.
    fn on_error(&mut self, _err: &str) {}

    /// Called when the connection closes, before the driver reconnects.
    fn on_close(&mut self) {}
}

/// Handle for sending frames back out over the active connection, passed
/// to `on_open` so a handler can subscribe without owning the socket.
pub struct FeedSender<'a> {
    sink: &'a mut futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        Message,
    >,
}

impl FeedSender<'_> {
    pub async fn send_text(&mut self, text: String) {
        if let Err(e) = self.sink.send(Message::Text(text)).await {
            warn!("failed to send subscription frame: {e}");
        }
    }
}

/// Drive one venue's connection: connect, dispatch to `handler`, and on
/// disconnect or transport error re-enter the connect loop immediately.
/// There is no backoff in this layer itself — only the Binance REST
/// snapshot fetch backs off, per the reconnect policy.
pub async fn run_feed(url: &str, venue: &str, mut handler: impl FeedHandler) -> ! {
    loop {
        info!("{venue}: connecting to {url}");
        match tokio_tungstenite::connect_async(url).await {
            Ok((stream, _)) => {
                info!("{venue}: connected");
                let (mut sink, mut stream) = stream.split();
                {
                    let mut sender = FeedSender { sink: &mut sink };
                    handler.on_open(&mut sender).await;
                }

                loop {
                    match stream.next().await {
                        Some(Ok(Message::Text(text))) => handler.on_message(&text).await,
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) | None => {
                            info!("{venue}: connection closed");
                            handler.on_close();
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("{venue}: transport error: {e}");
                            handler.on_error(&e.to_string());
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                error!("{venue}: failed to connect: {e}");
                handler.on_error(&e.to_string());
            }
        }
    }
}
