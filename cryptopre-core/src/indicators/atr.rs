//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); TR[0] = high-low.
//! ATR uses Wilder smoothing seeded with the mean of the first `period` TR values.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self { period }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let (h, l) = (bars[0].high, bars[0].low);
    if !h.is_nan() && !l.is_nan() {
        tr[0] = h - l;
    }

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
/// Seed: mean of the first `period` values, placed at index `period - 1`.
/// A NaN anywhere in the seed window or after it masks the rest of the output.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let seed_window = &values[..period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }

    let seed = seed_window.iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;

    for i in period..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                timestamp: i as i64,
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = Atr::new(3).compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // Seed: ATR[2] = mean(10, 8, 9) = 9
        // ATR[3] = (1/3)*6 + (2/3)*9 = 8
        // ATR[4] = (1/3)*6 + (2/3)*8 = 22/3
        assert_approx(result[2], 9.0, DEFAULT_EPSILON);
        assert_approx(result[3], 8.0, DEFAULT_EPSILON);
        assert_approx(result[4], 22.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_nan_in_seed_masks_everything() {
        let mut bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
        ]);
        bars[1].high = f64::NAN;
        let result = Atr::new(2).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 13);
    }
}
