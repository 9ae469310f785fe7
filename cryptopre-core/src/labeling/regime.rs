//! Trend / volatility regime classifier.
//!
//! First match wins, evaluated per bar with no lookback:
//! 1. UPTREND        ema_9 > ema_21 > ema_100
//! 2. DOWNTREND      ema_9 < ema_21 < ema_100
//! 3. HIGH_VOL_CHOP  atr_pct > high_vol_atr_pct
//! 4. LOW_VOL_RANGE  otherwise

use serde::{Deserialize, Serialize};

use super::{BarClassifier, ClassifyError};
use crate::domain::{FeatureBar, Features, Regime};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassifier {
    pub high_vol_atr_pct: f64,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self {
            high_vol_atr_pct: 0.015,
        }
    }
}

impl RegimeClassifier {
    /// Classify from the four required inputs.
    pub fn regime_for(&self, ema_9: f64, ema_21: f64, ema_100: f64, atr_pct: f64) -> Regime {
        if ema_9 > ema_21 && ema_21 > ema_100 {
            Regime::Uptrend
        } else if ema_9 < ema_21 && ema_21 < ema_100 {
            Regime::Downtrend
        } else if atr_pct > self.high_vol_atr_pct {
            Regime::HighVolChop
        } else {
            Regime::LowVolRange
        }
    }
}

fn required(features: &Features, index: usize) -> Result<[f64; 4], ClassifyError> {
    let pick = |field: &'static str, v: Option<f64>| {
        v.filter(|x| x.is_finite())
            .ok_or(ClassifyError::MissingInput { field, index })
    };
    Ok([
        pick("ema_9", features.ema_9)?,
        pick("ema_21", features.ema_21)?,
        pick("ema_100", features.ema_100)?,
        pick("atr_pct", features.atr_pct)?,
    ])
}

impl BarClassifier for RegimeClassifier {
    type Class = Regime;

    fn name(&self) -> &str {
        "regime"
    }

    fn classify(&self, rows: &[FeatureBar]) -> Result<Vec<Regime>, ClassifyError> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let [e9, e21, e100, atr_pct] = required(&row.features, i)?;
                Ok(self.regime_for(e9, e21, e100, atr_pct))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::feature_rows;

    #[test]
    fn uptrend_ignores_volatility() {
        let c = RegimeClassifier::default();
        assert_eq!(c.regime_for(10.0, 9.0, 8.0, 0.5), Regime::Uptrend);
        assert_eq!(c.regime_for(10.0, 9.0, 8.0, 0.0), Regime::Uptrend);
    }

    #[test]
    fn downtrend_strict_ordering() {
        let c = RegimeClassifier::default();
        assert_eq!(c.regime_for(8.0, 9.0, 10.0, 0.5), Regime::Downtrend);
    }

    #[test]
    fn ties_fall_through_to_volatility() {
        let c = RegimeClassifier::default();
        assert_eq!(c.regime_for(9.0, 9.0, 8.0, 0.02), Regime::HighVolChop);
        assert_eq!(c.regime_for(9.0, 9.0, 8.0, 0.015), Regime::LowVolRange);
        assert_eq!(c.regime_for(10.0, 8.0, 9.0, 0.001), Regime::LowVolRange);
    }

    #[test]
    fn classify_whole_batch() {
        let mut rows = feature_rows(&[1.0, 2.0, 3.0]);
        rows[1].features.ema_9 = Some(0.5);
        rows[1].features.atr_pct = Some(0.03);
        let out = RegimeClassifier::default().classify(&rows).unwrap();
        assert_eq!(out, vec![Regime::Uptrend, Regime::HighVolChop, Regime::Uptrend]);
    }

    #[test]
    fn missing_column_reported_with_index() {
        let mut rows = feature_rows(&[1.0, 2.0, 3.0]);
        rows[2].features.atr_pct = None;
        let err = RegimeClassifier::default().classify(&rows).unwrap_err();
        assert_eq!(err, ClassifyError::MissingInput { field: "atr_pct", index: 2 });
    }

    #[test]
    fn nan_counts_as_missing() {
        let mut rows = feature_rows(&[1.0]);
        rows[0].features.ema_100 = Some(f64::NAN);
        assert!(RegimeClassifier::default().classify(&rows).is_err());
    }
}
