/// Barflow Core - trade aggregation and anomaly detection
///
/// This library contains the runtime logic of the barflow pipeline:
/// - Core data types for trade events, OHLCV bars and anomaly alerts
/// - Time-bucketed OHLCV aggregation with dedup and late-event policy
/// - Threshold-based anomaly rules evaluated over a rolling bar window
/// - Collaborator traits for the queue, bar store, raw archive and alert
///   sink, with reference implementations used by the server wiring and
///   the test suite
///
/// The external feed protocol lives in `barflow-feed`; process wiring and
/// configuration-from-environment live in `barflow-server`.
pub mod aggregator;
pub mod alert;
pub mod anomaly;
pub mod bar;
pub mod config;
pub mod de;
pub mod dedup;
pub mod error;
pub mod event;
pub mod queue;
pub mod retry;
pub mod sink;
pub mod store;

// Re-export commonly used types for convenience
pub use aggregator::{Aggregator, IngestOutcome};
pub use alert::{AlertKind, AnomalyAlert, Severity};
pub use anomaly::{AnomalyEngine, AnomalyRunner};
pub use bar::{BucketSpec, OhlcvBar};
pub use config::{AggregatorConfig, AnomalyThresholds};
pub use error::{EventError, QueueError, SinkError, StoreError};
pub use event::{Symbol, TradeEvent};
pub use queue::{Delivery, TradeConsumer, TradePublisher, channel_queue};
pub use sink::{AlertSink, LogAlertSink, MemoryAlertSink};
pub use store::{ArchiveWriter, BarStore, FsArchive, MemoryArchive, MemoryBarStore};
