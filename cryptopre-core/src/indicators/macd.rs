//! MACD histogram.
//!
//! macd = EMA(fast) - EMA(slow); signal = EMA(signal_period) of macd;
//! histogram = macd - signal.
//! Lookback: slow - 1 + signal_period - 1.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct MacdHistogram {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl MacdHistogram {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be shorter than slow period");
        Self { fast, slow, signal }
    }
}

impl Indicator for MacdHistogram {
    fn name(&self) -> &str {
        "macd_hist"
    }

    fn lookback(&self) -> usize {
        (self.slow - 1) + (self.signal - 1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);

        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_of_series(&line, self.signal);

        line.iter().zip(&signal).map(|(l, s)| l - s).collect()
    }
}
