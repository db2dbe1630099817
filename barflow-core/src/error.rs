use crate::event::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the trade event invariants.
///
/// These are data errors: the offending event is rejected and logged, and
/// processing continues. They are never fatal to the pipeline.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum EventError {
    #[error("non-positive price {price} for trade {trade_id} on {symbol}")]
    NonPositivePrice {
        symbol: Symbol,
        trade_id: u64,
        price: Decimal,
    },

    #[error("negative quantity {quantity} for trade {trade_id} on {symbol}")]
    NegativeQuantity {
        symbol: Symbol,
        trade_id: u64,
        quantity: Decimal,
    },
}

/// Errors crossing the trade queue boundary.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to encode queue payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("queue payload is not a valid trade event: {0}")]
    Payload(String),

    #[error("queue publish failed: {0}")]
    Publish(String),

    #[error("queue closed")]
    Closed,
}

impl QueueError {
    /// Whether a retry at the call site can reasonably succeed.
    ///
    /// Encode/payload failures are data errors and never retried; a closed
    /// queue is terminal for the consuming loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Publish(_))
    }
}

/// Errors crossing the bar store or raw archive boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode archive line: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Io(_) => true,
            StoreError::Encode(_) => false,
        }
    }
}

/// Errors crossing the alert sink boundary.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("alert sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode alert payload: {0}")]
    Encode(#[from] serde_json::Error),
}
