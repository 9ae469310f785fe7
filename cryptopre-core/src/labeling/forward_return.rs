//! Forward-return threshold labeler.
//!
//! future_return[i] = (close[i + step] - close[i]) / close[i]
//! BUY if > threshold, SELL if < -threshold, HOLD otherwise (both bounds strict).
//! The last `step` bars have no future close and are dropped.

use serde::{Deserialize, Serialize};

use super::{BarClassifier, ClassifyError};
use crate::domain::{FeatureBar, Label};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturnLabeler {
    pub future_step: usize,
    pub threshold: f64,
}

impl Default for ForwardReturnLabeler {
    fn default() -> Self {
        Self {
            future_step: 1,
            threshold: 0.002,
        }
    }
}

impl ForwardReturnLabeler {
    pub fn new(future_step: usize, threshold: f64) -> Self {
        Self {
            future_step,
            threshold,
        }
    }

    /// Label for a single forward return.
    pub fn label_for(&self, future_return: f64) -> Label {
        if future_return > self.threshold {
            Label::Buy
        } else if future_return < -self.threshold {
            Label::Sell
        } else {
            Label::Hold
        }
    }

    /// Forward returns over a close series, `step` shorter than the input.
    pub fn future_returns(&self, closes: &[f64]) -> Result<Vec<f64>, ClassifyError> {
        self.validate()?;
        let step = self.future_step;
        if closes.len() <= step {
            return Ok(Vec::new());
        }
        (0..closes.len() - step)
            .map(|i| {
                let now = closes[i];
                let later = closes[i + step];
                if !now.is_finite() || now <= 0.0 {
                    return Err(ClassifyError::MissingInput { field: "close", index: i });
                }
                if !later.is_finite() {
                    return Err(ClassifyError::MissingInput {
                        field: "close",
                        index: i + step,
                    });
                }
                Ok((later - now) / now)
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ClassifyError> {
        if self.future_step == 0 {
            return Err(ClassifyError::InvalidParameter(
                "future_step must be >= 1".into(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ClassifyError::InvalidParameter(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

impl BarClassifier for ForwardReturnLabeler {
    type Class = Label;

    fn name(&self) -> &str {
        "forward_return"
    }

    fn classify(&self, rows: &[FeatureBar]) -> Result<Vec<Label>, ClassifyError> {
        let closes: Vec<f64> = rows.iter().map(|r| r.bar.close).collect();
        Ok(self
            .future_returns(&closes)?
            .into_iter()
            .map(|r| self.label_for(r))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::feature_rows;

    #[test]
    fn threshold_boundaries_are_strict() {
        let l = ForwardReturnLabeler::default();
        assert_eq!(l.label_for(0.002), Label::Hold);
        assert_eq!(l.label_for(-0.002), Label::Hold);
        assert_eq!(l.label_for(0.0021), Label::Buy);
        assert_eq!(l.label_for(-0.0021), Label::Sell);
        assert_eq!(l.label_for(0.0), Label::Hold);
    }

    #[test]
    fn drops_last_future_step_bars() {
        let rows = feature_rows(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let labels = ForwardReturnLabeler::new(2, 0.002).classify(&rows).unwrap();
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|l| *l == Label::Buy));
    }

    #[test]
    fn short_series_yields_nothing() {
        let rows = feature_rows(&[100.0]);
        assert!(ForwardReturnLabeler::default().classify(&rows).unwrap().is_empty());
        assert!(ForwardReturnLabeler::default().classify(&[]).unwrap().is_empty());
    }

    #[test]
    fn labels_follow_next_close() {
        let rows = feature_rows(&[100.0, 100.1, 99.0, 99.1]);
        let labels = ForwardReturnLabeler::default().classify(&rows).unwrap();
        // +0.1% → HOLD, -1.1% → SELL, +0.1% → HOLD
        assert_eq!(labels, vec![Label::Hold, Label::Sell, Label::Hold]);
    }

    #[test]
    fn future_returns_values() {
        let r = ForwardReturnLabeler::default()
            .future_returns(&[100.0, 110.0, 99.0])
            .unwrap();
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn zero_step_rejected() {
        let err = ForwardReturnLabeler::new(0, 0.002).classify(&[]).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidParameter(_)));
    }

    #[test]
    fn non_finite_close_rejected() {
        let mut rows = feature_rows(&[100.0, 101.0, 102.0]);
        rows[2].bar.close = f64::NAN;
        let err = ForwardReturnLabeler::default().classify(&rows).unwrap_err();
        assert_eq!(err, ClassifyError::MissingInput { field: "close", index: 2 });
    }
}
