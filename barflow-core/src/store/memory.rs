use super::{ArchiveWriter, BarStore, UpsertFn};
use crate::{
    bar::OhlcvBar,
    error::StoreError,
    event::{Symbol, TradeEvent},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

/// In-memory [`BarStore`].
///
/// The write lock is held across the upsert closure, which is exactly the
/// atomicity a key-value backend provides with a conditional put: two
/// concurrent upserts to the same `(symbol, bucket_start)` serialise and
/// neither fold is lost.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    bars: RwLock<FnvHashMap<Symbol, BTreeMap<DateTime<Utc>, OhlcvBar>>>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bars across all symbols.
    pub fn bar_count(&self) -> usize {
        self.bars.read().values().map(BTreeMap::len).sum()
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn upsert_with(
        &self,
        symbol: &Symbol,
        bucket_start: DateTime<Utc>,
        apply: UpsertFn<'_>,
    ) -> Result<OhlcvBar, StoreError> {
        let mut bars = self.bars.write();
        let by_bucket = bars.entry(symbol.clone()).or_default();
        let next = apply(by_bucket.get(&bucket_start).cloned());
        by_bucket.insert(bucket_start, next.clone());
        Ok(next)
    }

    async fn recent(&self, symbol: &Symbol, limit: usize) -> Result<Vec<OhlcvBar>, StoreError> {
        let bars = self.bars.read();
        Ok(bars
            .get(symbol)
            .map(|by_bucket| by_bucket.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// In-memory [`ArchiveWriter`] for tests.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    events: Mutex<Vec<TradeEvent>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TradeEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl ArchiveWriter for MemoryArchive {
    async fn append(&self, event: &TradeEvent) -> Result<(), StoreError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
