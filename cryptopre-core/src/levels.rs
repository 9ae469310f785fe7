//! Stop-loss / take-profit level policies.
//!
//! Two policies coexist and stay separate types:
//! - [`AtrBracket`]: historical simulation. SL at 1.5 ATR, TP at 2.0 ATR.
//! - [`FixedFractionBracket`]: live signal display. Volatility is taken as a
//!   fixed 0.3% of price, SL at 2x and TP at 4x that unit, quoted R/R 2.0.
//!
//! Both return `Ok(None)` for HOLD; the caller must not open a position.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Direction, Label, TradeLevels};

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum LevelError {
    #[error("invalid ATR {0}: must be finite and positive")]
    InvalidAtr(f64),

    #[error("invalid entry price {0}: must be finite and positive")]
    InvalidPrice(f64),
}

/// A rule that brackets an entry price with SL and TP levels.
pub trait LevelPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Levels for a decision at `entry` with volatility `atr`.
    fn levels(
        &self,
        entry: f64,
        atr: f64,
        label: Label,
    ) -> Result<Option<TradeLevels>, LevelError>;
}

/// ATR-multiple bracket used by the backtester.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrBracket {
    pub stop_mult: f64,
    pub target_mult: f64,
}

impl Default for AtrBracket {
    fn default() -> Self {
        Self {
            stop_mult: 1.5,
            target_mult: 2.0,
        }
    }
}

impl LevelPolicy for AtrBracket {
    fn name(&self) -> &str {
        "atr_bracket"
    }

    fn levels(
        &self,
        entry: f64,
        atr: f64,
        label: Label,
    ) -> Result<Option<TradeLevels>, LevelError> {
        let Some(direction) = label.direction() else {
            return Ok(None);
        };
        if !entry.is_finite() || entry <= 0.0 {
            return Err(LevelError::InvalidPrice(entry));
        }
        if !atr.is_finite() || atr <= 0.0 {
            return Err(LevelError::InvalidAtr(atr));
        }
        Ok(Some(bracket(
            entry,
            self.stop_mult * atr,
            self.target_mult * atr,
            direction,
            self.target_mult / self.stop_mult,
        )))
    }
}

/// Price-fraction bracket used when displaying a live signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedFractionBracket {
    /// Volatility unit as a fraction of price.
    pub volatility_fraction: f64,
    pub stop_mult: f64,
    pub target_mult: f64,
    /// Quoted risk/reward, reported as-is.
    pub risk_reward: f64,
}

impl Default for FixedFractionBracket {
    fn default() -> Self {
        Self {
            volatility_fraction: 0.003,
            stop_mult: 2.0,
            target_mult: 4.0,
            risk_reward: 2.0,
        }
    }
}

impl LevelPolicy for FixedFractionBracket {
    fn name(&self) -> &str {
        "fixed_fraction_bracket"
    }

    /// The `atr` argument is ignored; volatility is derived from `entry`.
    fn levels(
        &self,
        entry: f64,
        _atr: f64,
        label: Label,
    ) -> Result<Option<TradeLevels>, LevelError> {
        let Some(direction) = label.direction() else {
            return Ok(None);
        };
        if !entry.is_finite() || entry <= 0.0 {
            return Err(LevelError::InvalidPrice(entry));
        }
        let unit = entry * self.volatility_fraction;
        Ok(Some(bracket(
            entry,
            self.stop_mult * unit,
            self.target_mult * unit,
            direction,
            self.risk_reward,
        )))
    }
}

fn bracket(
    entry: f64,
    risk: f64,
    reward: f64,
    direction: Direction,
    risk_reward: f64,
) -> TradeLevels {
    let (stop_loss, take_profit) = match direction {
        Direction::Long => (entry - risk, entry + reward),
        Direction::Short => (entry + risk, entry - reward),
    };
    TradeLevels {
        entry,
        stop_loss,
        take_profit,
        direction,
        risk_reward,
    }
}
