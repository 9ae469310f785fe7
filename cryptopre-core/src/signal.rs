//! Live signal assembly.
//!
//! The classifier itself is external; its output arrives as a [`Prediction`].
//! This module turns that prediction plus the latest feature row into the
//! displayable signal: entry, SL/TP from [`FixedFractionBracket`], a trend
//! score, and a one-line description.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FeatureBar, Label, TradeLevels};
use crate::levels::{FixedFractionBracket, LevelError, LevelPolicy};

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("no feature rows to build a signal from")]
    NoData,

    #[error("confidence {0} outside [0, 1]")]
    InvalidConfidence(f64),

    #[error(transparent)]
    Levels(#[from] LevelError),
}

/// Classifier output: a class and its probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the predicted class, in [0, 1].
    pub confidence: f64,
}

/// Momentum score of the latest row.
///
/// +1 for each EMA (9/21/50/100) the close sits above; RSI > 55 adds 1,
/// RSI < 45 subtracts 1; MACD histogram > 0 adds 1, otherwise subtracts 1.
/// Missing columns contribute nothing.
pub fn trend_strength(row: &FeatureBar) -> i32 {
    let f = &row.features;
    let close = row.bar.close;
    let mut score = 0;

    for ema in [f.ema_9, f.ema_21, f.ema_50, f.ema_100].into_iter().flatten() {
        if close > ema {
            score += 1;
        }
    }

    if let Some(rsi) = f.rsi {
        if rsi > 55.0 {
            score += 1;
        }
        if rsi < 45.0 {
            score -= 1;
        }
    }

    if let Some(hist) = f.macd_hist {
        if hist > 0.0 {
            score += 1;
        } else {
            score -= 1;
        }
    }

    score
}

pub fn trend_description(label: Label, score: i32) -> String {
    match label {
        Label::Buy => format!("Uptrend detected with positive momentum (Trend Score: {score})."),
        Label::Sell => format!("Downtrend pressure increasing (Trend Score: {score})."),
        Label::Hold => format!("Market neutral; no strong trend (Trend Score: {score})."),
    }
}

/// Everything shown for one live signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSignal {
    pub symbol: String,
    pub label: Label,
    /// Confidence in percent.
    pub confidence_pct: f64,
    pub price: f64,
    /// `None` for HOLD.
    pub levels: Option<TradeLevels>,
    pub trend_score: i32,
    pub description: String,
}

impl LiveSignal {
    /// Build the signal for the last row of `rows`.
    pub fn assemble(
        symbol: &str,
        prediction: Prediction,
        rows: &[FeatureBar],
        policy: &FixedFractionBracket,
    ) -> Result<Self, SignalError> {
        let last = rows.last().ok_or(SignalError::NoData)?;
        if !(0.0..=1.0).contains(&prediction.confidence) {
            return Err(SignalError::InvalidConfidence(prediction.confidence));
        }

        let price = last.bar.close;
        let levels = policy.levels(price, f64::NAN, prediction.label)?;
        let score = trend_strength(last);

        Ok(Self {
            symbol: symbol.to_string(),
            label: prediction.label,
            confidence_pct: prediction.confidence * 100.0,
            price,
            levels,
            trend_score: score,
            description: trend_description(prediction.label, score),
        })
    }
}
