//! Bar classification policies.
//!
//! - [`ForwardReturnLabeler`]: tradeable BUY/HOLD/SELL label from the return
//!   `future_step` bars ahead. Drives the backtester.
//! - [`RegimeClassifier`]: descriptive trend/volatility regime from the bar's
//!   own precomputed indicators.
//!
//! Both implement [`BarClassifier`] so callers can swap them behind one seam.
//! A batch with missing inputs is rejected whole; nothing is partially labeled.

pub mod forward_return;
pub mod regime;

pub use forward_return::ForwardReturnLabeler;
pub use regime::RegimeClassifier;

use thiserror::Error;

use crate::domain::{FeatureBar, LabeledBar};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("missing input '{field}' at row {index}")]
    MissingInput { field: &'static str, index: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A policy that maps a bar sequence to one class per classifiable bar.
pub trait BarClassifier: Send + Sync {
    type Class;

    fn name(&self) -> &str;

    /// Classify the batch. The output is aligned with the input from index 0;
    /// it may be shorter when trailing bars have no defined class.
    fn classify(&self, rows: &[FeatureBar]) -> Result<Vec<Self::Class>, ClassifyError>;
}

/// Label rows (and optionally tag regimes), dropping the unlabeled tail.
pub fn label_rows(
    rows: &[FeatureBar],
    labeler: &ForwardReturnLabeler,
    regimes: Option<&RegimeClassifier>,
) -> Result<Vec<LabeledBar>, ClassifyError> {
    Ok(label_rows_with_returns(rows, labeler, regimes)?
        .into_iter()
        .map(|(labeled, _)| labeled)
        .collect())
}

/// [`label_rows`], keeping the forward return each label was derived from.
pub fn label_rows_with_returns(
    rows: &[FeatureBar],
    labeler: &ForwardReturnLabeler,
    regimes: Option<&RegimeClassifier>,
) -> Result<Vec<(LabeledBar, f64)>, ClassifyError> {
    let closes: Vec<f64> = rows.iter().map(|r| r.bar.close).collect();
    let returns = labeler.future_returns(&closes)?;
    let regimes = regimes.map(|r| r.classify(rows)).transpose()?;

    Ok(returns
        .into_iter()
        .enumerate()
        .map(|(i, future_return)| {
            let row = &rows[i];
            let labeled =
                LabeledBar::new(row.bar, row.features.atr, labeler.label_for(future_return));
            let labeled = match &regimes {
                Some(r) => labeled.with_regime(r[i]),
                None => labeled,
            };
            (labeled, future_return)
        })
        .collect())
}

#[cfg(test)]
pub(crate) fn feature_rows(closes: &[f64]) -> Vec<FeatureBar> {
    use crate::domain::{Bar, Features};
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| FeatureBar {
            bar: Bar {
                timestamp: i as i64,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1.0,
            },
            features: Features {
                ema_9: Some(3.0),
                ema_21: Some(2.0),
                ema_50: Some(1.5),
                ema_100: Some(1.0),
                rsi: Some(50.0),
                macd_hist: Some(0.0),
                atr: Some(2.0),
                atr_pct: Some(0.01),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Label, Regime};

    #[test]
    fn label_rows_joins_labels_and_regimes() {
        let rows = feature_rows(&[100.0, 101.0, 100.0, 100.0]);
        let regimes = RegimeClassifier::default();
        let out = label_rows(&rows, &ForwardReturnLabeler::default(), Some(&regimes)).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].label, Label::Buy);
        assert_eq!(out[1].label, Label::Sell);
        assert_eq!(out[2].label, Label::Hold);
        assert!(out.iter().all(|b| b.regime == Some(Regime::Uptrend)));
        assert_eq!(out[0].atr, Some(2.0));
    }

    #[test]
    fn label_rows_without_regime() {
        let rows = feature_rows(&[100.0, 101.0]);
        let out = label_rows(&rows, &ForwardReturnLabeler::default(), None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].regime, None);
    }

    #[test]
    fn returns_line_up_with_labels() {
        let rows = feature_rows(&[100.0, 101.0, 100.0, 100.1]);
        let out = label_rows_with_returns(&rows, &ForwardReturnLabeler::default(), None).unwrap();
        assert_eq!(out.len(), 3);
        assert!((out[0].1 - 0.01).abs() < 1e-12);
        assert_eq!(out[0].0.label, Label::Buy);
        assert!((out[1].1 + 1.0 / 101.0).abs() < 1e-12);
        assert_eq!(out[1].0.label, Label::Sell);
        assert!((out[2].1 - 0.001).abs() < 1e-12);
        assert_eq!(out[2].0.label, Label::Hold);

        let plain = label_rows(&rows, &ForwardReturnLabeler::default(), None).unwrap();
        let joined: Vec<LabeledBar> = out.into_iter().map(|(b, _)| b).collect();
        assert_eq!(plain, joined);
    }

    #[test]
    fn regime_failure_rejects_whole_batch() {
        let mut rows = feature_rows(&[100.0, 101.0, 102.0]);
        rows[1].features.ema_21 = None;
        let regimes = RegimeClassifier::default();
        let err = label_rows(&rows, &ForwardReturnLabeler::default(), Some(&regimes)).unwrap_err();
        assert_eq!(err, ClassifyError::MissingInput { field: "ema_21", index: 1 });
    }
}
