use crate::error::EventError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Exchange pair identifier (e.g. "BTCUSDT").
///
/// Normalised to uppercase on construction so that lookups are
/// case-insensitive regardless of how the feed spells the pair.
#[derive(
    Debug,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
    derive_more::Display,
)]
#[display("{_0}")]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn new<S: AsRef<str>>(symbol: S) -> Self {
        Self(SmolStr::new(symbol.as_ref().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One executed trade, normalised from the feed.
///
/// Immutable once constructed. `trade_time` is exchange-assigned and may
/// arrive out of order relative to `ingest_time`; bucketing uses
/// `trade_time`. `(symbol, trade_id)` is the dedup identity under
/// at-least-once redelivery.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, derive_more::Constructor)]
pub struct TradeEvent {
    pub symbol: Symbol,
    pub trade_id: u64,
    pub price: Decimal,
    pub quantity: Decimal,
    pub trade_time: DateTime<Utc>,
    pub ingest_time: DateTime<Utc>,
}

impl TradeEvent {
    /// Check the trade invariants: `price > 0`, `quantity >= 0`.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.price <= Decimal::ZERO {
            return Err(EventError::NonPositivePrice {
                symbol: self.symbol.clone(),
                trade_id: self.trade_id,
                price: self.price,
            });
        }
        if self.quantity < Decimal::ZERO {
            return Err(EventError::NegativeQuantity {
                symbol: self.symbol.clone(),
                trade_id: self.trade_id,
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn event(price: Decimal, quantity: Decimal) -> TradeEvent {
        TradeEvent::new(
            Symbol::new("btcusdt"),
            1,
            price,
            quantity,
            Utc::now(),
            Utc::now(),
        )
    }

    #[test]
    fn test_symbol_uppercased() {
        assert_eq!(Symbol::new("btcusdt").as_str(), "BTCUSDT");
        assert_eq!(Symbol::new("BTCUSDT"), Symbol::from("btcUsdt"));
    }

    #[test]
    fn test_trade_event_validate() {
        struct TestCase {
            input: TradeEvent,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: valid event
                input: event(dec!(100.5), dec!(0.25)),
                expected: true,
            },
            TestCase {
                // TC1: zero quantity is allowed
                input: event(dec!(100.5), dec!(0)),
                expected: true,
            },
            TestCase {
                // TC2: zero price is rejected
                input: event(dec!(0), dec!(1)),
                expected: false,
            },
            TestCase {
                // TC3: negative price is rejected
                input: event(dec!(-5), dec!(1)),
                expected: false,
            },
            TestCase {
                // TC4: negative quantity is rejected
                input: event(dec!(100), dec!(-0.1)),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.validate().is_ok();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_trade_event_json_round_trip() {
        let input = event(dec!(16578.50), dec!(0.001));
        let json = serde_json::to_string(&input).unwrap();
        let actual: TradeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(actual, input);
    }
}
