use barflow_core::{EventError, Symbol, TradeEvent, de};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Frames received on the trade stream.
///
/// The combined stream also carries subscription acks and other
/// housekeeping frames; those are routed to `Ignore` rather than treated
/// as errors.
#[derive(Clone, Debug)]
pub enum FeedMessage {
    Ignore,
    Trade(BinanceTrade),
}

impl<'de> Deserialize<'de> for FeedMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        // combined streams wrap the payload: {"stream": "...", "data": {...}}
        let payload = value.get("data").unwrap_or(&value);

        match payload.get("e") {
            Some(event_type) if event_type == "trade" => {
                // round-trip through a string so borrowed-str fields
                // (string-encoded decimals) deserialize
                let raw = serde_json::to_string(payload).map_err(serde::de::Error::custom)?;
                serde_json::from_str::<BinanceTrade>(&raw)
                    .map(FeedMessage::Trade)
                    .map_err(serde::de::Error::custom)
            }
            _ => Ok(FeedMessage::Ignore),
        }
    }
}

/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams>
/// ```json
/// {
///     "e": "trade",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "t": 12345,
///     "p": "16569.01",
///     "q": "0.014",
///     "T": 1672515782134,
///     "m": true,
///     "M": true
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BinanceTrade {
    #[serde(rename = "s")]
    pub market: String,

    #[serde(rename = "t")]
    pub id: u64,

    #[serde(alias = "p", deserialize_with = "de::de_str")]
    pub price: Decimal,

    #[serde(alias = "q", deserialize_with = "de::de_str")]
    pub quantity: Decimal,

    #[serde(
        alias = "T",
        deserialize_with = "de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,
}

impl BinanceTrade {
    /// Normalise into a validated [`TradeEvent`], stamping receipt time.
    pub fn into_event(self, ingest_time: DateTime<Utc>) -> Result<TradeEvent, EventError> {
        let event = TradeEvent::new(
            Symbol::new(&self.market),
            self.id,
            self.price,
            self.quantity,
            self.time,
            ingest_time,
        );
        event.validate()?;
        Ok(event)
    }
}
