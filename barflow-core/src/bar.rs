use crate::event::{Symbol, TradeEvent};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed aggregation interval used to bucket trades into bars.
///
/// Bucket boundaries are computed on epoch milliseconds with integer floor
/// division, so a trade at time `T` always lands in
/// `floor(T / interval) * interval` regardless of arrival order.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BucketSpec {
    interval_ms: i64,
}

impl BucketSpec {
    /// Canonical 1-minute bucket.
    pub const ONE_MINUTE: BucketSpec = BucketSpec { interval_ms: 60_000 };

    /// Construct a bucket spec from an interval length.
    ///
    /// Returns `None` for zero or negative intervals.
    pub fn new(interval: Duration) -> Option<Self> {
        let interval_ms = interval.num_milliseconds();
        (interval_ms > 0).then_some(Self { interval_ms })
    }

    pub fn from_secs(secs: u32) -> Option<Self> {
        Self::new(Duration::seconds(i64::from(secs)))
    }

    pub fn interval(&self) -> Duration {
        Duration::milliseconds(self.interval_ms)
    }

    /// Floor a timestamp to the start of its bucket.
    pub fn bucket_start(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let floored = time.timestamp_millis().div_euclid(self.interval_ms) * self.interval_ms;
        // floored is derived from a valid timestamp, so conversion cannot fail
        DateTime::from_timestamp_millis(floored).unwrap_or(time)
    }

    /// Number of whole buckets `older` lags behind `newer`.
    ///
    /// Negative when `older` is actually ahead of `newer`.
    pub fn buckets_behind(&self, older: DateTime<Utc>, newer: DateTime<Utc>) -> i64 {
        (newer.timestamp_millis() - older.timestamp_millis()).div_euclid(self.interval_ms)
    }
}

/// Aggregated trade statistics for one symbol over one bucket.
///
/// Identity is `(symbol, bucket_start)`. High/low/volume/trade_count are
/// commutative folds and therefore order-invariant; `close` is
/// last-applied-wins by processing order.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct OhlcvBar {
    pub symbol: Symbol,
    pub bucket_start: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trade_count: u64,
}

impl OhlcvBar {
    /// Seed a new bar from the first trade observed in a bucket.
    pub fn open_with(bucket_start: DateTime<Utc>, event: &TradeEvent) -> Self {
        Self {
            symbol: event.symbol.clone(),
            bucket_start,
            open: event.price,
            high: event.price,
            low: event.price,
            close: event.price,
            volume: event.quantity,
            trade_count: 1,
        }
    }

    /// Fold another trade from the same bucket into the bar.
    pub fn apply(&mut self, event: &TradeEvent) {
        self.high = self.high.max(event.price);
        self.low = self.low.min(event.price);
        self.close = event.price;
        self.volume += event.quantity;
        self.trade_count += 1;
    }
}
