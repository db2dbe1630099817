use crate::event::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The anomaly rule that fired.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceSpike,
    VolumeSpike,
    SmaDivergence,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlertKind::PriceSpike => "price_spike",
            AlertKind::VolumeSpike => "volume_spike",
            AlertKind::SmaDivergence => "sma_divergence",
        };
        write!(f, "{}", name)
    }
}

#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Grade a fired rule by how far the observation overshot its threshold.
    ///
    /// Ratio >= 2 escalates to High, >= 1.25 to Medium. A rule that fired
    /// exactly at its threshold grades Low.
    pub fn from_overshoot(observed: Decimal, threshold: Decimal) -> Self {
        if threshold <= Decimal::ZERO {
            return Severity::Low;
        }
        let ratio = observed / threshold;
        if ratio >= Decimal::TWO {
            Severity::High
        } else if ratio >= Decimal::new(125, 2) {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{}", name)
    }
}

/// A detected deviation, emitted once per rule per evaluation run.
///
/// Never mutated after creation; retention/eviction is the alert store's
/// concern, not ours.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct AnomalyAlert {
    pub id: Uuid,
    pub symbol: Symbol,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub observed: Decimal,
    pub threshold: Decimal,
    pub detected_at: DateTime<Utc>,
}

impl AnomalyAlert {
    pub fn new(
        symbol: Symbol,
        kind: AlertKind,
        message: String,
        observed: Decimal,
        threshold: Decimal,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            kind,
            severity: Severity::from_overshoot(observed, threshold),
            message,
            observed,
            threshold,
            detected_at,
        }
    }
}
