//! Alert sink boundary.

use crate::{alert::AnomalyAlert, error::SinkError};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Destination for detected anomalies. Delivery semantics (push
/// notification, message topic, log shipper) are the sink's concern.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, alert: &AnomalyAlert) -> Result<(), SinkError>;
}

/// Sink that emits each alert as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn publish(&self, alert: &AnomalyAlert) -> Result<(), SinkError> {
        tracing::warn!(
            alert_id = %alert.id,
            symbol = %alert.symbol,
            kind = %alert.kind,
            severity = %alert.severity,
            observed = %alert.observed,
            threshold = %alert.threshold,
            detected_at = %alert.detected_at,
            "{}",
            alert.message
        );
        Ok(())
    }
}

/// Collecting sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<AnomalyAlert>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<AnomalyAlert> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn publish(&self, alert: &AnomalyAlert) -> Result<(), SinkError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}
