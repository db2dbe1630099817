use crate::event::Symbol;
use chrono::{DateTime, Duration, Utc};
use fnv::FnvHashMap;

/// Bounded record of recently processed trade identities.
///
/// At-least-once delivery means the same trade can be re-delivered after a
/// consumer crash or visibility timeout; re-applying it would double-count
/// volume. Identities are retained for the configured window and swept
/// lazily, so memory stays proportional to the trade rate within one
/// retention period.
#[derive(Debug)]
pub struct DedupWindow {
    retention: Duration,
    seen: FnvHashMap<(Symbol, u64), DateTime<Utc>>,
    next_sweep: DateTime<Utc>,
}

impl DedupWindow {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            seen: FnvHashMap::default(),
            next_sweep: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Whether this trade identity was applied within the retention window.
    pub fn contains(&self, symbol: &Symbol, trade_id: u64, now: DateTime<Utc>) -> bool {
        self.seen
            .get(&(symbol.clone(), trade_id))
            .is_some_and(|seen_at| now.signed_duration_since(*seen_at) < self.retention)
    }

    /// Record a trade identity as applied.
    pub fn record(&mut self, symbol: Symbol, trade_id: u64, now: DateTime<Utc>) {
        if now >= self.next_sweep {
            self.sweep(now);
        }
        self.seen.insert((symbol, trade_id), now);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let retention = self.retention;
        self.seen
            .retain(|_, seen_at| now.signed_duration_since(*seen_at) < retention);
        self.next_sweep = now + retention;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym() -> Symbol {
        Symbol::new("BTCUSDT")
    }

    #[test]
    fn test_duplicate_within_retention_is_detected() {
        let mut dedup = DedupWindow::new(Duration::minutes(5));
        let t0 = Utc::now();

        assert!(!dedup.contains(&sym(), 42, t0));
        dedup.record(sym(), 42, t0);
        assert!(dedup.contains(&sym(), 42, t0 + Duration::minutes(1)));
    }

    #[test]
    fn test_identity_expires_after_retention() {
        let mut dedup = DedupWindow::new(Duration::minutes(5));
        let t0 = Utc::now();

        dedup.record(sym(), 42, t0);
        assert!(!dedup.contains(&sym(), 42, t0 + Duration::minutes(5)));
    }

    #[test]
    fn test_sweep_bounds_memory() {
        let mut dedup = DedupWindow::new(Duration::minutes(5));
        let t0 = Utc::now();

        for trade_id in 0..100 {
            dedup.record(sym(), trade_id, t0);
        }
        assert_eq!(dedup.len(), 100);

        // next record past the sweep deadline drops the expired identities
        dedup.record(sym(), 100, t0 + Duration::minutes(10));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_same_id_different_symbols_are_distinct() {
        let mut dedup = DedupWindow::new(Duration::minutes(5));
        let t0 = Utc::now();

        dedup.record(Symbol::new("BTCUSDT"), 7, t0);
        assert!(!dedup.contains(&Symbol::new("ETHUSDT"), 7, t0));
    }
}
