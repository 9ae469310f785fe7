//! Trade decisions, outcomes, and the trade-log record.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::label::Direction;

/// Stop-loss / take-profit bracket around an entry price.
///
/// Long: `stop_loss < entry < take_profit`. Short: reversed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub direction: Direction,
    /// Reward distance divided by risk distance.
    pub risk_reward: f64,
}

impl TradeLevels {
    /// True when SL and TP sit on the correct sides of the entry.
    pub fn straddles_entry(&self) -> bool {
        match self.direction {
            Direction::Long => self.stop_loss < self.entry && self.entry < self.take_profit,
            Direction::Short => self.take_profit < self.entry && self.entry < self.stop_loss,
        }
    }
}

/// Result of checking one decision against the following bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeOutcome {
    #[serde(rename = "TP")]
    TpHit,
    #[serde(rename = "SL")]
    SlHit,
    #[serde(rename = "NONE")]
    None,
}

impl TradeOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeOutcome::TpHit => "TP",
            TradeOutcome::SlHit => "SL",
            TradeOutcome::None => "NONE",
        }
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the trade log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Index of the decision bar in the labeled sequence.
    pub index: usize,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub direction: Direction,
    pub outcome: TradeOutcome,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.outcome == TradeOutcome::TpHit
    }

    pub fn is_loser(&self) -> bool {
        self.outcome == TradeOutcome::SlHit
    }
}
