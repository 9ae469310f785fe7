//! Running balance and the append-only equity curve.

use serde::{Deserialize, Serialize};

use crate::domain::TradeOutcome;

/// Equity tracker.
///
/// `curve[0]` is always the initial balance; one snapshot is appended per
/// processed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityState {
    initial: f64,
    balance: f64,
    curve: Vec<f64>,
}

impl EquityState {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            balance: initial,
            curve: vec![initial],
        }
    }

    /// Apply one resolved decision and snapshot the balance.
    pub fn apply(&mut self, outcome: TradeOutcome, win_multiplier: f64, loss_multiplier: f64) {
        match outcome {
            TradeOutcome::TpHit => self.balance *= win_multiplier,
            TradeOutcome::SlHit => self.balance *= loss_multiplier,
            TradeOutcome::None => {}
        }
        self.curve.push(self.balance);
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn curve(&self) -> &[f64] {
        &self.curve
    }
}
