/// Barflow Feed - live trade ingestion
///
/// Maintains a WebSocket connection to a Binance-style trade stream,
/// parses and validates each frame into a well-typed `TradeEvent`, and
/// forwards it onto the trade queue. Malformed frames are dropped and
/// logged; publish failures after bounded retries force a reconnect
/// rather than silent data loss.
pub mod config;
pub mod error;
pub mod ingestor;
pub mod message;

pub use config::FeedConfig;
pub use error::FeedError;
pub use ingestor::TradeIngestor;
pub use message::{BinanceTrade, FeedMessage};
