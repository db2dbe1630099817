//! Reconnecting feed drive loop.

use crate::{config::FeedConfig, error::FeedError, message::FeedMessage};
use barflow_core::{QueueError, TradeEvent, TradePublisher, retry::retry};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Trade Ingestor: connects to the exchange trade stream and forwards
/// each validated [`TradeEvent`] onto the trade queue.
///
/// Holds no state beyond the open connection. Parse failures drop the
/// frame; connection errors and exhausted publish retries tear the
/// connection down and the loop reconnects after a jittered delay.
pub struct TradeIngestor<P> {
    config: FeedConfig,
    publisher: P,
}

impl<P> TradeIngestor<P>
where
    P: TradePublisher,
{
    pub fn new(config: FeedConfig, publisher: P) -> Self {
        Self { config, publisher }
    }

    /// Drive the feed until shutdown is signalled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(url = %self.config.url, symbols = ?self.config.symbols, "starting trade ingestor");

        loop {
            if *shutdown.borrow() {
                return;
            }

            match self.drive_connection(&mut shutdown).await {
                Ok(()) => {
                    info!("trade ingestor stopped");
                    return;
                }
                Err(feed_error) => {
                    error!(error = %feed_error, "feed connection lost, will reconnect");
                }
            }

            let delay = jittered(self.config.reconnect_delay);
            debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// One connection lifetime: handshake, then read frames until the
    /// connection dies or shutdown is signalled. `Ok(())` means shutdown.
    async fn drive_connection(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), FeedError> {
        let url = self.config.stream_url();
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|error| FeedError::Connection(error.to_string()))?;
        info!(%url, "connected to trade feed");

        let (mut write, mut read) = ws_stream.split();
        let mut ping = tokio::time::interval(self.config.ping_interval);
        // the immediate first tick would ping before any data has flowed
        ping.tick().await;

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    if let Err(error) = write.send(Message::Ping(vec![].into())).await {
                        return Err(FeedError::Connection(format!("ping failed: {error}")));
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text).await?,
                    Some(Ok(Message::Close(_))) => {
                        return Err(FeedError::Connection("server closed connection".to_string()));
                    }
                    // tungstenite answers pings itself
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        return Err(FeedError::Connection(error.to_string()));
                    }
                    None => {
                        return Err(FeedError::Connection("stream ended".to_string()));
                    }
                }
            }
        }
    }

    /// Parse and forward one text frame.
    ///
    /// Data errors are logged and dropped here; only terminal errors
    /// (exhausted publish retries) propagate to the caller.
    async fn handle_frame(&self, text: &str) -> Result<(), FeedError> {
        match parse_frame(text, Utc::now()) {
            Ok(Some(event)) => self.publish(&event).await,
            Ok(None) => Ok(()),
            Err(feed_error) if !feed_error.is_terminal() => {
                warn!(error = %feed_error, frame = text, "dropping feed frame");
                Ok(())
            }
            Err(feed_error) => Err(feed_error),
        }
    }

    async fn publish(&self, event: &TradeEvent) -> Result<(), FeedError> {
        let backoff = self.config.publish_backoff;
        retry(
            backoff,
            "trade publish",
            QueueError::is_transient,
            || self.publisher.publish(event),
        )
        .await
        .map_err(|source| FeedError::Publish {
            attempts: backoff.attempts,
            source,
        })
    }
}

/// Parse one raw frame into an optional trade event.
///
/// `Ok(None)` is a housekeeping frame (subscription ack, combined-stream
/// metadata); `Err` is a malformed or invariant-violating frame that must
/// never travel downstream.
pub fn parse_frame(
    text: &str,
    ingest_time: DateTime<Utc>,
) -> Result<Option<TradeEvent>, FeedError> {
    let message = serde_json::from_str::<FeedMessage>(text)
        .map_err(|error| FeedError::MalformedMessage(error.to_string()))?;

    match message {
        FeedMessage::Ignore => Ok(None),
        FeedMessage::Trade(trade) => Ok(Some(trade.into_event(ingest_time)?)),
    }
}

fn jittered(delay: Duration) -> Duration {
    let jitter_ms = rand::rng().random_range(0..=delay.as_millis() as u64 / 2);
    delay + Duration::from_millis(jitter_ms)
}
