//! Indicator implementations and the feature-set builder.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each
//! returns a series the same length as its input, with `f64::NAN` through its
//! warmup window. `FeatureSet` runs the fixed column set the labelers and the
//! regime classifier expect and converts NaN to `None` at the boundary.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use atr::Atr;
pub use ema::Ema;
pub use macd::MacdHistogram;
pub use rsi::Rsi;

use crate::domain::{Bar, FeatureBar, Features};

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "ema_21", "atr").
    fn name(&self) -> &str;

    /// Number of leading bars that are NaN.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Exponentially weighted mean without bias adjustment.
///
/// Leading NaNs are skipped; the first valid value seeds the average and
/// results stay NaN until `min_periods` observations have been seen. A NaN
/// after the seed taints every later value.
pub fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };

    let mut prev = values[start];
    let mut seen = 1usize;
    if seen >= min_periods {
        result[start] = prev;
    }

    for i in (start + 1)..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        seen += 1;
        if seen >= min_periods {
            result[i] = prev;
        }
    }

    result
}

/// The fixed indicator column set attached to every bar.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub ema_9: Ema,
    pub ema_21: Ema,
    pub ema_50: Ema,
    pub ema_100: Ema,
    pub rsi: Rsi,
    pub macd_hist: MacdHistogram,
    pub atr: Atr,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            ema_9: Ema::new(9),
            ema_21: Ema::new(21),
            ema_50: Ema::new(50),
            ema_100: Ema::new(100),
            rsi: Rsi::new(14),
            macd_hist: MacdHistogram::new(12, 26, 9),
            atr: Atr::new(14),
        }
    }
}

impl FeatureSet {
    /// Longest warmup across all columns.
    pub fn lookback(&self) -> usize {
        [
            self.ema_9.lookback(),
            self.ema_21.lookback(),
            self.ema_50.lookback(),
            self.ema_100.lookback(),
            self.rsi.lookback(),
            self.macd_hist.lookback(),
            self.atr.lookback(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Attach features to every bar. Warmup rows carry `None` columns.
    pub fn compute(&self, bars: &[Bar]) -> Vec<FeatureBar> {
        let ema_9 = self.ema_9.compute(bars);
        let ema_21 = self.ema_21.compute(bars);
        let ema_50 = self.ema_50.compute(bars);
        let ema_100 = self.ema_100.compute(bars);
        let rsi = self.rsi.compute(bars);
        let macd_hist = self.macd_hist.compute(bars);
        let atr = self.atr.compute(bars);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let atr_val = finite(atr[i]);
                let atr_pct = atr_val
                    .filter(|_| bar.close > 0.0)
                    .map(|a| a / bar.close);
                FeatureBar {
                    bar: *bar,
                    features: Features {
                        ema_9: finite(ema_9[i]),
                        ema_21: finite(ema_21[i]),
                        ema_50: finite(ema_50[i]),
                        ema_100: finite(ema_100[i]),
                        rsi: finite(rsi[i]),
                        macd_hist: finite(macd_hist[i]),
                        atr: atr_val,
                        atr_pct,
                    },
                }
            })
            .collect()
    }

    /// Attach features and drop every row with a missing column.
    pub fn compute_complete(&self, bars: &[Bar]) -> Vec<FeatureBar> {
        self.compute(bars)
            .into_iter()
            .filter(|row| row.features.is_complete())
            .collect()
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: 1_704_067_200_000 + i as i64 * 3_600_000,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
