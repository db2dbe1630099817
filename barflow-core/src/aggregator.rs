//! Trade-to-bar aggregation.
//!
//! Consumes trade events in arbitrary order with possible duplicates and
//! maintains correct running OHLCV bars per `(symbol, bucket_start)`.
//! High/low/volume/trade_count are commutative folds, so they are correct
//! under any reordering within the dedup retention window; `close` is
//! last-applied-wins by processing order.

use crate::{
    bar::OhlcvBar,
    config::AggregatorConfig,
    dedup::DedupWindow,
    error::{EventError, StoreError},
    event::{Symbol, TradeEvent},
    store::{ArchiveWriter, BarStore},
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use tracing::{debug, warn};

/// What happened to one ingested event.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IngestOutcome {
    /// Folded into its bar; carries the post-upsert bar state.
    Applied(OhlcvBar),
    /// Identity already applied within the dedup retention window.
    Duplicate,
    /// Refused by the late-event policy.
    Stale { buckets_late: i64 },
    /// Invariant violation; the event was not applied.
    Rejected(EventError),
}

/// OHLCV aggregator over a [`BarStore`] and an [`ArchiveWriter`].
///
/// A transient store failure surfaces as `Err`, leaving the delivery
/// unacknowledged so the queue re-delivers it; every other outcome is a
/// settled event the caller should acknowledge.
pub struct Aggregator<S, A> {
    config: AggregatorConfig,
    store: S,
    archive: A,
    dedup: DedupWindow,
    /// Newest bucket seen per symbol, for the late-event policy.
    frontier: FnvHashMap<Symbol, DateTime<Utc>>,
}

impl<S, A> Aggregator<S, A>
where
    S: BarStore,
    A: ArchiveWriter,
{
    pub fn new(config: AggregatorConfig, store: S, archive: A) -> Self {
        let dedup = DedupWindow::new(config.dedup_retention);
        Self {
            config,
            store,
            archive,
            dedup,
            frontier: FnvHashMap::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest one trade event.
    pub async fn ingest(&mut self, event: TradeEvent) -> Result<IngestOutcome, StoreError> {
        if let Err(error) = event.validate() {
            warn!(%error, body = ?event, "rejected invalid trade event");
            return Ok(IngestOutcome::Rejected(error));
        }

        let now = Utc::now();
        if self.dedup.contains(&event.symbol, event.trade_id, now) {
            debug!(
                symbol = %event.symbol,
                trade_id = event.trade_id,
                "duplicate delivery, not reapplied"
            );
            return Ok(IngestOutcome::Duplicate);
        }

        let bucket_start = self.config.bucket.bucket_start(event.trade_time);

        if let Some(max_late) = self.config.max_late_buckets {
            if let Some(frontier) = self.frontier.get(&event.symbol) {
                let buckets_late = self.config.bucket.buckets_behind(bucket_start, *frontier);
                if buckets_late > i64::from(max_late) {
                    warn!(
                        symbol = %event.symbol,
                        trade_id = event.trade_id,
                        buckets_late,
                        max_late,
                        "refusing update to closed bucket"
                    );
                    return Ok(IngestOutcome::Stale { buckets_late });
                }
            }
        }

        let bar = {
            let event = &event;
            self.store
                .upsert_with(
                    &event.symbol,
                    bucket_start,
                    Box::new(move |existing| match existing {
                        Some(mut bar) => {
                            bar.apply(event);
                            bar
                        }
                        None => OhlcvBar::open_with(bucket_start, event),
                    }),
                )
                .await?
        };

        // Archive is audit, bars are the system of record: a failed append
        // after a successful upsert is logged, not retried through
        // redelivery (that would look like a duplicate to the dedup set).
        if let Err(error) = self.archive.append(&event).await {
            warn!(
                %error,
                symbol = %event.symbol,
                trade_id = event.trade_id,
                "raw archive append failed"
            );
        }

        // Recorded only after the upsert: a crash in between re-delivers
        // and re-applies exactly once.
        self.dedup.record(event.symbol.clone(), event.trade_id, now);

        self.frontier
            .entry(event.symbol.clone())
            .and_modify(|newest| {
                if bucket_start > *newest {
                    *newest = bucket_start;
                }
            })
            .or_insert(bucket_start);

        Ok(IngestOutcome::Applied(bar))
    }
}
