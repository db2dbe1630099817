//! Deserialization helpers for exchange wire formats.
//!
//! Exchanges encode decimals as JSON strings and timestamps as epoch
//! milliseconds; these helpers are referenced from `deserialize_with`
//! field attributes wherever that shape appears.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de};
use std::{fmt::Display, str::FromStr, time::Duration};

/// Deserialize a `T` from its string representation.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: &str = Deserialize::deserialize(deserializer)?;
    raw.parse::<T>().map_err(de::Error::custom)
}

/// Deserialize a `u64` epoch millisecond timestamp as a [`DateTime<Utc>`].
pub fn de_u64_epoch_ms_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis: u64 = Deserialize::deserialize(deserializer)?;
    Ok(datetime_utc_from_epoch_duration(Duration::from_millis(
        millis,
    )))
}

/// Construct a [`DateTime<Utc>`] from a [`Duration`] since the Unix epoch.
pub fn datetime_utc_from_epoch_duration(duration: Duration) -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH + duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "de_str")]
        price: Decimal,
        #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
        time: DateTime<Utc>,
    }

    #[test]
    fn test_de_str_decimal_and_epoch_ms() {
        let actual: Probe =
            serde_json::from_str(r#"{"price": "16578.50", "time": 1672304486865}"#).unwrap();

        assert_eq!(
            actual,
            Probe {
                price: dec!(16578.50),
                time: datetime_utc_from_epoch_duration(Duration::from_millis(1672304486865)),
            }
        );
    }

    #[test]
    fn test_de_str_rejects_non_numeric() {
        let actual =
            serde_json::from_str::<Probe>(r#"{"price": "not-a-number", "time": 1672304486865}"#);
        assert!(actual.is_err());
    }
}
