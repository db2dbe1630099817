use crate::bar::BucketSpec;
use chrono::Duration;
use rust_decimal::Decimal;

/// Aggregator policy knobs, constructed once at startup and passed in.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Bucket interval for OHLCV bars.
    pub bucket: BucketSpec,
    /// How long dedup identities are retained. Sized to the queue's
    /// redelivery horizon (visibility timeout), not to the bucket length.
    pub dedup_retention: Duration,
    /// Late-event policy: `Some(n)` refuses updates to buckets more than
    /// `n` intervals behind the newest bucket seen for that symbol.
    /// `None` lets late events mutate closed bars.
    pub max_late_buckets: Option<u32>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bucket: BucketSpec::ONE_MINUTE,
            dedup_retention: Duration::minutes(5),
            max_late_buckets: None,
        }
    }
}

impl AggregatorConfig {
    pub fn with_bucket(mut self, bucket: BucketSpec) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn with_dedup_retention(mut self, retention: Duration) -> Self {
        self.dedup_retention = retention;
        self
    }

    pub fn with_max_late_buckets(mut self, max: Option<u32>) -> Self {
        self.max_late_buckets = max;
        self
    }
}

/// Thresholds and windows for the anomaly rules.
///
/// Ratios are fractions, not percentages: a 5% price move threshold is
/// `0.05`.
#[derive(Debug, Clone)]
pub struct AnomalyThresholds {
    /// Minimum |close-to-close| move, as a fraction of the previous close.
    pub price_threshold: Decimal,
    /// Latest volume must reach `volume_multiplier * mean(prior volumes)`.
    pub volume_multiplier: Decimal,
    /// Number of prior bars averaged for the volume baseline.
    pub volume_window: usize,
    /// Minimum |close - SMA| divergence, as a fraction of the SMA.
    pub sma_threshold: Decimal,
    /// Number of bars (including the latest) in the SMA.
    pub sma_window: usize,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            price_threshold: Decimal::new(5, 2),
            volume_multiplier: Decimal::from(3),
            volume_window: 20,
            sma_threshold: Decimal::new(2, 2),
            sma_window: 20,
        }
    }
}

impl AnomalyThresholds {
    /// Sanity-check the configuration. Called once at startup; a violation
    /// here is a config error and fatal to the process.
    pub fn validate(&self) -> Result<(), String> {
        if self.price_threshold <= Decimal::ZERO {
            return Err(format!(
                "price_threshold must be positive, got {}",
                self.price_threshold
            ));
        }
        if self.volume_multiplier <= Decimal::ZERO {
            return Err(format!(
                "volume_multiplier must be positive, got {}",
                self.volume_multiplier
            ));
        }
        if self.sma_threshold <= Decimal::ZERO {
            return Err(format!(
                "sma_threshold must be positive, got {}",
                self.sma_threshold
            ));
        }
        if self.volume_window < 1 {
            return Err("volume_window must be at least 1".to_string());
        }
        if self.sma_window < 2 {
            return Err("sma_window must be at least 2".to_string());
        }
        Ok(())
    }

    /// Bars to fetch so every rule has a full window available.
    pub fn bars_required(&self) -> usize {
        // volume window excludes the latest bar, hence +1
        (self.volume_window + 1).max(self.sma_window).max(2)
    }
}
