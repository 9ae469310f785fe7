//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: EMA[0] = close[0]; the first `period - 1` outputs are masked as warmup.
//! Lookback: period - 1.

use super::{ewm, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute raw EMA values from a pre-extracted f64 slice.
/// Used by MACD, which needs the EMA of its own line.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm(values, 2.0 / (period as f64 + 1.0), period)
}
