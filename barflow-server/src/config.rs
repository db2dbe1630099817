//! Process configuration, read from the environment exactly once at
//! startup. Business logic never performs ambient lookups; everything it
//! needs arrives through these structs.

use barflow_core::{AggregatorConfig, AnomalyThresholds, BucketSpec, Symbol};
use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the pipeline needs, resolved and validated.
#[derive(Debug, Clone)]
pub struct Config {
    pub symbols: Vec<Symbol>,
    pub feed_url: Url,
    pub archive_root: PathBuf,
    pub queue_capacity: usize,
    pub bucket_interval: Duration,
    pub aggregator: AggregatorConfig,
    pub thresholds: AnomalyThresholds,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// Thresholds are percent-valued (`BARFLOW_PRICE_THRESHOLD_PCT=5`
    /// means a 5% move) and converted to fractions here. Any missing
    /// required value or unparseable override is fatal: the process
    /// refuses to start rather than run with a silently degraded config.
    pub fn from_env() -> Result<Self, ConfigError> {
        let symbols = parse_symbols(&env::var("BARFLOW_SYMBOLS").unwrap_or_default())?;

        let feed_url = {
            let raw = env::var("BARFLOW_FEED_URL")
                .unwrap_or_else(|_| "wss://stream.binance.com:9443".to_string());
            Url::parse(&raw).map_err(|error| ConfigError::Invalid {
                var: "BARFLOW_FEED_URL",
                value: raw,
                reason: error.to_string(),
            })?
        };

        let archive_root =
            PathBuf::from(env::var("BARFLOW_ARCHIVE_ROOT").unwrap_or_else(|_| "data".to_string()));

        let queue_capacity = parse_or("BARFLOW_QUEUE_CAPACITY", 10_000usize)?;

        let interval_secs: u32 = parse_or("BARFLOW_INTERVAL_SECS", 60)?;
        let bucket = BucketSpec::from_secs(interval_secs).ok_or(ConfigError::Invalid {
            var: "BARFLOW_INTERVAL_SECS",
            value: interval_secs.to_string(),
            reason: "interval must be positive".to_string(),
        })?;

        let dedup_retention_secs: i64 = parse_or("BARFLOW_DEDUP_RETENTION_SECS", 300)?;
        let max_late_buckets: Option<u32> = match env::var("BARFLOW_MAX_LATE_BUCKETS") {
            Ok(raw) => Some(parse_var("BARFLOW_MAX_LATE_BUCKETS", &raw)?),
            Err(_) => None,
        };

        let aggregator = AggregatorConfig::default()
            .with_bucket(bucket)
            .with_dedup_retention(ChronoDuration::seconds(dedup_retention_secs))
            .with_max_late_buckets(max_late_buckets);

        let thresholds = AnomalyThresholds {
            price_threshold: pct_to_fraction(parse_or("BARFLOW_PRICE_THRESHOLD_PCT", Decimal::from(5))?),
            volume_multiplier: parse_or("BARFLOW_VOLUME_MULTIPLIER", Decimal::from(3))?,
            volume_window: parse_or("BARFLOW_VOLUME_WINDOW", 20usize)?,
            sma_threshold: pct_to_fraction(parse_or("BARFLOW_SMA_THRESHOLD_PCT", Decimal::TWO)?),
            sma_window: parse_or("BARFLOW_SMA_WINDOW", 20usize)?,
        };
        thresholds.validate().map_err(|reason| ConfigError::Invalid {
            var: "BARFLOW_*_THRESHOLD",
            value: format!("{thresholds:?}"),
            reason,
        })?;

        Ok(Self {
            symbols,
            feed_url,
            archive_root,
            queue_capacity,
            bucket_interval: Duration::from_secs(u64::from(interval_secs)),
            aggregator,
            thresholds,
        })
    }
}

fn parse_symbols(raw: &str) -> Result<Vec<Symbol>, ConfigError> {
    let symbols: Vec<Symbol> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Symbol::new)
        .collect();

    if symbols.is_empty() {
        return Err(ConfigError::Missing(
            "BARFLOW_SYMBOLS (comma-separated list, e.g. BTCUSDT,ETHUSDT)",
        ));
    }
    Ok(symbols)
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|error| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: error.to_string(),
    })
}

fn parse_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => parse_var(var, &raw),
        Err(_) => Ok(default),
    }
}

fn pct_to_fraction(pct: Decimal) -> Decimal {
    pct / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        let symbols = parse_symbols("btcusdt, ETHUSDT").unwrap();
        assert_eq!(symbols, vec![Symbol::new("BTCUSDT"), Symbol::new("ETHUSDT")]);

        assert!(parse_symbols("").is_err());
        assert!(parse_symbols(" , ").is_err());
    }

    #[test]
    fn test_pct_to_fraction() {
        assert_eq!(pct_to_fraction(Decimal::from(5)), Decimal::new(5, 2));
    }

    #[test]
    fn test_parse_var_reports_offender() {
        let actual = parse_var::<u32>("BARFLOW_INTERVAL_SECS", "sixty");
        match actual {
            Err(ConfigError::Invalid { var, value, .. }) => {
                assert_eq!(var, "BARFLOW_INTERVAL_SECS");
                assert_eq!(value, "sixty");
            }
            other => panic!("expected invalid error, got {other:?}"),
        }
    }
}
