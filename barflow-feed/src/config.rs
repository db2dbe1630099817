use barflow_core::retry::Backoff;
use std::time::Duration;

/// Trade feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket endpoint of the exchange stream host.
    pub url: String,
    /// Pairs to subscribe to.
    pub symbols: Vec<String>,
    /// Ping interval to keep the connection alive.
    pub ping_interval: Duration,
    /// Reconnection delay after a terminal connection error.
    pub reconnect_delay: Duration,
    /// Retry policy for queue publishes before declaring the connection
    /// dead.
    pub publish_backoff: Backoff,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "wss://stream.binance.com:9443".to_string(),
            symbols: vec!["BTCUSDT".to_string()],
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            publish_backoff: Backoff::default(),
        }
    }
}

impl FeedConfig {
    pub fn new(url: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            url: url.into(),
            symbols,
            ..Default::default()
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_publish_backoff(mut self, backoff: Backoff) -> Self {
        self.publish_backoff = backoff;
        self
    }

    /// Combined-stream URL subscribing every configured symbol's trade
    /// channel, e.g.
    /// `wss://host/stream?streams=btcusdt@trade/ethusdt@trade`.
    pub fn stream_url(&self) -> String {
        let streams = self
            .symbols
            .iter()
            .map(|symbol| format!("{}@trade", symbol.to_lowercase()))
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/stream?streams={}", self.url.trim_end_matches('/'), streams)
    }
}
