mod config;

use barflow_core::{
    Aggregator, AnomalyEngine, AnomalyRunner, FsArchive, IngestOutcome, LogAlertSink,
    MemoryBarStore, QueueError, TradeConsumer, channel_queue, retry::Backoff,
};
use barflow_feed::{FeedConfig, TradeIngestor};
use config::Config;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(config_error) => {
            error!(error = %config_error, "configuration invalid, refusing to start");
            std::process::exit(1);
        }
    };

    info!(
        symbols = ?config.symbols,
        feed_url = %config.feed_url,
        archive_root = %config.archive_root.display(),
        interval_secs = config.bucket_interval.as_secs(),
        "starting barflow pipeline"
    );

    // the archive root must be writable before the pipeline starts
    if let Err(io_error) = std::fs::create_dir_all(&config.archive_root) {
        error!(
            error = %io_error,
            root = %config.archive_root.display(),
            "archive root not creatable, refusing to start"
        );
        std::process::exit(1);
    }

    let (publisher, consumer) = channel_queue(config.queue_capacity);
    let store = Arc::new(MemoryBarStore::new());
    let archive = FsArchive::new(&config.archive_root);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let feed_config = FeedConfig::new(
        config.feed_url.as_str().trim_end_matches('/'),
        config
            .symbols
            .iter()
            .map(|symbol| symbol.as_str().to_string())
            .collect(),
    );
    let ingestor = TradeIngestor::new(feed_config, publisher);
    let feed_task = tokio::spawn(ingestor.run(shutdown_rx.clone()));

    let aggregator = Aggregator::new(config.aggregator.clone(), store.clone(), archive);
    let aggregator_task = tokio::spawn(consume_trades(
        consumer,
        aggregator,
        shutdown_rx.clone(),
    ));

    let runner = AnomalyRunner::new(
        AnomalyEngine::new(config.thresholds.clone()),
        store,
        Arc::new(LogAlertSink),
        config.symbols.clone(),
        config.bucket_interval,
    );
    let anomaly_task = tokio::spawn(runner.run(shutdown_rx));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(io_error) => error!(error = %io_error, "failed to listen for shutdown signal"),
    }

    // stop accepting new work, let in-flight items finish, then exit
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(feed_task, aggregator_task, anomaly_task);
    info!("barflow pipeline stopped");
}

/// Queue consumption loop: receive, parse, ingest, acknowledge.
///
/// Poison messages are acknowledged after logging so they never block the
/// queue; transient store failures are retried with backoff and, if still
/// failing, the delivery is left unacknowledged for redelivery.
async fn consume_trades<S, A>(
    mut consumer: impl TradeConsumer,
    mut aggregator: Aggregator<S, A>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: barflow_core::BarStore,
    A: barflow_core::ArchiveWriter,
{
    let backoff = Backoff::default();

    loop {
        let delivery = tokio::select! {
            received = consumer.receive() => match received {
                Ok(delivery) => delivery,
                Err(QueueError::Closed) => {
                    info!("trade queue closed, aggregator stopping");
                    return;
                }
                Err(queue_error) => {
                    warn!(error = %queue_error, "queue receive failed");
                    continue;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("aggregator stopping");
                    return;
                }
                continue;
            }
        };

        let event = match delivery.parse() {
            Ok(event) => event,
            Err(queue_error) => {
                warn!(error = %queue_error, body = delivery.body(), "acknowledging poison message");
                if let Err(ack_error) = consumer.ack(delivery).await {
                    warn!(error = %ack_error, "poison message ack failed");
                }
                continue;
            }
        };

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            match aggregator.ingest(event.clone()).await {
                Ok(outcome) => break Some(outcome),
                Err(store_error) if store_error.is_transient() && attempt < backoff.attempts => {
                    let delay = backoff.delay(attempt);
                    warn!(
                        error = %store_error,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "bar upsert failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(store_error) => {
                    warn!(error = %store_error, "bar upsert still failing, leaving for redelivery");
                    break None;
                }
            }
        };

        match outcome {
            Some(IngestOutcome::Applied(bar)) => {
                tracing::debug!(
                    symbol = %bar.symbol,
                    bucket_start = %bar.bucket_start,
                    close = %bar.close,
                    volume = %bar.volume,
                    trade_count = bar.trade_count,
                    "bar updated"
                );
            }
            // settled outcomes: already logged inside the aggregator
            Some(_) => {}
            None => {
                // leave unacknowledged: the queue will redeliver and the
                // dedup window keeps the retry idempotent
                continue;
            }
        }

        if let Err(ack_error) = consumer.ack(delivery).await {
            warn!(error = %ack_error, "ack failed, event may be redelivered");
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // JSON output for log shippers via BARFLOW_LOG_FORMAT=json
    if std::env::var("BARFLOW_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
