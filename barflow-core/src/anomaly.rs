//! Threshold-based anomaly rules over a rolling bar window.
//!
//! Each run is independent: the engine carries no state between
//! evaluations, so an anomaly that persists across runs re-fires each run
//! unless the sink deduplicates. All comparisons are inclusive (`>=`).

use crate::{
    alert::{AlertKind, AnomalyAlert},
    bar::OhlcvBar,
    config::AnomalyThresholds,
    event::Symbol,
    sink::AlertSink,
    store::BarStore,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Evaluates the fixed rule set against a window of bars, newest first.
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    thresholds: AnomalyThresholds,
}

impl AnomalyEngine {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnomalyThresholds {
        &self.thresholds
    }

    /// Evaluate every rule against `bars` (ordered newest first).
    ///
    /// Pure function of the window and the thresholds: no side effects
    /// beyond the returned alerts. Rules with insufficient data or a zero
    /// denominator are skipped, never errors.
    pub fn evaluate(&self, bars: &[OhlcvBar]) -> Vec<AnomalyAlert> {
        let mut alerts = Vec::new();
        alerts.extend(self.price_spike(bars));
        alerts.extend(self.volume_spike(bars));
        alerts.extend(self.sma_divergence(bars));
        alerts
    }

    /// Close-to-close move between the two most recent bars.
    fn price_spike(&self, bars: &[OhlcvBar]) -> Option<AnomalyAlert> {
        let [latest, previous, ..] = bars else {
            return None;
        };

        let Some(change) = ratio_of(latest.close - previous.close, previous.close) else {
            debug!(symbol = %latest.symbol, "price spike skipped: previous close is zero");
            return None;
        };

        (change >= self.thresholds.price_threshold).then(|| {
            AnomalyAlert::new(
                latest.symbol.clone(),
                AlertKind::PriceSpike,
                format!(
                    "{} close moved {}% ({} -> {}) between {} and {}",
                    latest.symbol,
                    to_pct(change),
                    previous.close,
                    latest.close,
                    previous.bucket_start,
                    latest.bucket_start,
                ),
                change,
                self.thresholds.price_threshold,
                latest.bucket_start,
            )
        })
    }

    /// Latest volume against the mean volume of the prior window.
    fn volume_spike(&self, bars: &[OhlcvBar]) -> Option<AnomalyAlert> {
        let (latest, prior) = bars.split_first()?;
        // need at least two prior bars for a meaningful baseline
        if prior.len() < 2 {
            return None;
        }
        let window = &prior[..prior.len().min(self.thresholds.volume_window)];

        let Some(average) = mean(window.iter().map(|bar| bar.volume)) else {
            return None;
        };
        let Some(multiple) = ratio_of(latest.volume, average) else {
            debug!(symbol = %latest.symbol, "volume spike skipped: zero average volume");
            return None;
        };

        (multiple >= self.thresholds.volume_multiplier).then(|| {
            AnomalyAlert::new(
                latest.symbol.clone(),
                AlertKind::VolumeSpike,
                format!(
                    "{} volume {} is {}x the {}-bar average {}",
                    latest.symbol,
                    latest.volume,
                    multiple.round_dp(2),
                    window.len(),
                    average.round_dp(8),
                ),
                multiple,
                self.thresholds.volume_multiplier,
                latest.bucket_start,
            )
        })
    }

    /// Divergence of the latest close from the trailing SMA of closes.
    fn sma_divergence(&self, bars: &[OhlcvBar]) -> Option<AnomalyAlert> {
        if bars.len() < self.thresholds.sma_window {
            return None;
        }
        let latest = bars.first()?;
        let window = &bars[..self.thresholds.sma_window];

        let sma = mean(window.iter().map(|bar| bar.close))?;
        let Some(divergence) = ratio_of(latest.close - sma, sma) else {
            debug!(symbol = %latest.symbol, "sma divergence skipped: zero moving average");
            return None;
        };

        (divergence >= self.thresholds.sma_threshold).then(|| {
            AnomalyAlert::new(
                latest.symbol.clone(),
                AlertKind::SmaDivergence,
                format!(
                    "{} close {} diverges {}% from the {}-bar SMA {}",
                    latest.symbol,
                    latest.close,
                    to_pct(divergence),
                    self.thresholds.sma_window,
                    sma.round_dp(8),
                ),
                divergence,
                self.thresholds.sma_threshold,
                latest.bucket_start,
            )
        })
    }
}

/// `|numerator| / denominator`, or `None` when the denominator is zero.
fn ratio_of(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator.abs().checked_div(denominator.abs())
}

fn mean(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;
    for value in values {
        sum += value;
        count += 1;
    }
    sum.checked_div(Decimal::from(count))
}

fn to_pct(fraction: Decimal) -> Decimal {
    (fraction * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Drives the engine on a fixed schedule against the bar store.
///
/// One tick per bucket interval; each tick fetches the recent window for
/// every configured symbol and publishes whatever fires. A store read
/// failure aborts that symbol only and is retried on the next tick.
pub struct AnomalyRunner<S, K> {
    engine: AnomalyEngine,
    store: Arc<S>,
    sink: Arc<K>,
    symbols: Vec<Symbol>,
    period: std::time::Duration,
}

impl<S, K> AnomalyRunner<S, K>
where
    S: BarStore,
    K: AlertSink,
{
    pub fn new(
        engine: AnomalyEngine,
        store: Arc<S>,
        sink: Arc<K>,
        symbols: Vec<Symbol>,
        period: std::time::Duration,
    ) -> Self {
        Self {
            engine,
            store,
            sink,
            symbols,
            period,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // consume the immediate first tick; there is nothing to evaluate yet
        ticker.tick().await;

        info!(
            symbols = self.symbols.len(),
            period_secs = self.period.as_secs(),
            "anomaly runner started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_once().await,
                changed = shutdown.changed() => {
                    // sender dropped counts as shutdown too
                    if changed.is_err() || *shutdown.borrow() {
                        info!("anomaly runner stopping");
                        return;
                    }
                }
            }
        }
    }

    /// One evaluation pass over every configured symbol.
    pub async fn run_once(&self) {
        let fetch = self.engine.thresholds().bars_required();
        for symbol in &self.symbols {
            let bars = match self.store.recent(symbol, fetch).await {
                Ok(bars) => bars,
                Err(error) => {
                    warn!(%error, %symbol, "bar fetch failed, skipping symbol until next run");
                    continue;
                }
            };

            for alert in self.engine.evaluate(&bars) {
                if let Err(error) = self.sink.publish(&alert).await {
                    warn!(%error, alert_id = %alert.id, "alert publish failed");
                }
            }
        }
    }
}
