//! Relative Strength Index (RSI).
//!
//! Wilder smoothing (alpha = 1/period) of the up and down moves of close.
//! RSI = 100 - 100 / (1 + avg_up / avg_down); avg_down == 0 → 100.
//! Lookback: period.

use super::{ewm, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut up = vec![f64::NAN; n];
        let mut down = vec![f64::NAN; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            if change.is_nan() {
                continue;
            }
            up[i] = change.max(0.0);
            down[i] = (-change).max(0.0);
        }

        let alpha = 1.0 / self.period as f64;
        let avg_up = ewm(&up, alpha, self.period);
        let avg_down = ewm(&down, alpha, self.period);

        avg_up
            .iter()
            .zip(&avg_down)
            .map(|(&u, &d)| {
                if u.is_nan() || d.is_nan() {
                    f64::NAN
                } else if d == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + u / d)
                }
            })
            .collect()
    }
}
