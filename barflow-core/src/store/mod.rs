//! Bar store and raw archive boundaries.
//!
//! The key-value store holding OHLCV bars and the append-only archive
//! holding raw trades are external, multi-writer resources. Correctness
//! under concurrent aggregator instances relies entirely on the store's
//! atomic single-key read-modify-write; there is no client-side locking.

mod archive;
mod memory;

pub use archive::FsArchive;
pub use memory::{MemoryArchive, MemoryBarStore};

use crate::{
    bar::OhlcvBar,
    error::StoreError,
    event::{Symbol, TradeEvent},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Closure applied inside the store's atomic read-modify-write.
pub type UpsertFn<'a> = Box<dyn FnOnce(Option<OhlcvBar>) -> OhlcvBar + Send + 'a>;

/// Key-value store of OHLCV bars keyed by `(symbol, bucket_start)`.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Atomically upsert the bar for `(symbol, bucket_start)`.
    ///
    /// The store MUST execute `apply` within a single-key atomic update
    /// (conditional put / transaction): concurrent upserts to the same key
    /// must serialise, never lose one side's fold. Callers never perform a
    /// read-then-write pair themselves.
    async fn upsert_with(
        &self,
        symbol: &Symbol,
        bucket_start: DateTime<Utc>,
        apply: UpsertFn<'_>,
    ) -> Result<OhlcvBar, StoreError>;

    /// Last `limit` bars for `symbol`, ordered by `bucket_start`
    /// descending (newest first).
    async fn recent(&self, symbol: &Symbol, limit: usize) -> Result<Vec<OhlcvBar>, StoreError>;
}

/// Append-only archive of raw trade events, partitioned by date and hour.
///
/// Write-only from the pipeline's perspective; duplicate appends are
/// acceptable (audit data, not aggregated state).
#[async_trait]
pub trait ArchiveWriter: Send + Sync {
    async fn append(&self, event: &TradeEvent) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: BarStore + ?Sized> BarStore for std::sync::Arc<T> {
    async fn upsert_with(
        &self,
        symbol: &Symbol,
        bucket_start: DateTime<Utc>,
        apply: UpsertFn<'_>,
    ) -> Result<OhlcvBar, StoreError> {
        (**self).upsert_with(symbol, bucket_start, apply).await
    }

    async fn recent(&self, symbol: &Symbol, limit: usize) -> Result<Vec<OhlcvBar>, StoreError> {
        (**self).recent(symbol, limit).await
    }
}

#[async_trait]
impl<T: ArchiveWriter + ?Sized> ArchiveWriter for std::sync::Arc<T> {
    async fn append(&self, event: &TradeEvent) -> Result<(), StoreError> {
        (**self).append(event).await
    }
}
