//! Bar, the fundamental market data unit, plus its feature and label overlays.

use serde::{Deserialize, Serialize};

use super::label::{Label, Regime};

/// OHLCV candle for a single symbol over one fixed interval.
///
/// `timestamp` is the candle open time in unix milliseconds. Files that carry
/// no time column get the row index instead, which keeps ordering intact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// True when both ends of the high/low range are finite.
    pub fn has_finite_range(&self) -> bool {
        self.high.is_finite() && self.low.is_finite()
    }
}

/// Precomputed indicator columns attached to a bar.
///
/// `None` means the column was absent from the source or the value was
/// still in its warmup window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub ema_9: Option<f64>,
    pub ema_21: Option<f64>,
    pub ema_50: Option<f64>,
    pub ema_100: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_hist: Option<f64>,
    pub atr: Option<f64>,
    pub atr_pct: Option<f64>,
}

impl Features {
    /// True when every column holds a finite value.
    pub fn is_complete(&self) -> bool {
        self.columns().iter().all(|(_, v)| v.is_some_and(f64::is_finite))
    }

    /// Column name / value pairs in canonical order.
    pub fn columns(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("ema_9", self.ema_9),
            ("ema_21", self.ema_21),
            ("ema_50", self.ema_50),
            ("ema_100", self.ema_100),
            ("rsi", self.rsi),
            ("macd_hist", self.macd_hist),
            ("atr", self.atr),
            ("atr_pct", self.atr_pct),
        ]
    }
}

/// A bar with its indicator overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBar {
    pub bar: Bar,
    pub features: Features,
}

/// A bar tagged with its forward-looking label, ready for the backtester.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledBar {
    pub bar: Bar,
    pub atr: Option<f64>,
    pub label: Label,
    pub regime: Option<Regime>,
}

impl LabeledBar {
    pub fn new(bar: Bar, atr: Option<f64>, label: Label) -> Self {
        Self {
            bar,
            atr,
            label,
            regime: None,
        }
    }

    pub fn with_regime(mut self, regime: Regime) -> Self {
        self.regime = Some(regime);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: 1_704_067_200_000,
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn finite_range() {
        assert!(sample_bar().has_finite_range());
        let mut bar = sample_bar();
        bar.low = f64::NAN;
        assert!(!bar.has_finite_range());
        bar.low = 98.0;
        bar.high = f64::INFINITY;
        assert!(!bar.has_finite_range());
    }

    #[test]
    fn features_completeness() {
        let mut f = Features {
            ema_9: Some(1.0),
            ema_21: Some(1.0),
            ema_50: Some(1.0),
            ema_100: Some(1.0),
            rsi: Some(50.0),
            macd_hist: Some(0.0),
            atr: Some(2.0),
            atr_pct: Some(0.02),
        };
        assert!(f.is_complete());
        f.rsi = None;
        assert!(!f.is_complete());
        f.rsi = Some(f64::NAN);
        assert!(!f.is_complete());
    }

    #[test]
    fn labeled_bar_serialization_roundtrip() {
        let lb = LabeledBar::new(sample_bar(), Some(2.0), Label::Buy).with_regime(Regime::Uptrend);
        let json = serde_json::to_string(&lb).unwrap();
        let deser: LabeledBar = serde_json::from_str(&json).unwrap();
        assert_eq!(lb, deser);
    }
}
