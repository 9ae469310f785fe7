//! Discrete trade labels and descriptive market regimes.
//!
//! One encoding is used everywhere: SELL = 0, HOLD = 1, BUY = 2. Files that
//! carry any other integer in the label column are rejected at load time.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelCodeError {
    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i64 },

    #[error("unrecognized {kind} '{input}'")]
    Unrecognized { kind: &'static str, input: String },
}

/// Forward-looking trade decision class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Sell,
    Hold,
    Buy,
}

impl Label {
    pub fn code(self) -> u8 {
        match self {
            Label::Sell => 0,
            Label::Hold => 1,
            Label::Buy => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, LabelCodeError> {
        match code {
            0 => Ok(Label::Sell),
            1 => Ok(Label::Hold),
            2 => Ok(Label::Buy),
            _ => Err(LabelCodeError::UnknownCode { kind: "label", code }),
        }
    }

    /// Trade direction implied by the label; HOLD opens nothing.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Label::Buy => Some(Direction::Long),
            Label::Sell => Some(Direction::Short),
            Label::Hold => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Sell => "SELL",
            Label::Hold => "HOLD",
            Label::Buy => "BUY",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = LabelCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELL" => Ok(Label::Sell),
            "HOLD" => Ok(Label::Hold),
            "BUY" => Ok(Label::Buy),
            other => other
                .parse::<i64>()
                .map_err(|_| LabelCodeError::Unrecognized {
                    kind: "label",
                    input: s.trim().to_string(),
                })
                .and_then(Label::from_code),
        }
    }
}

/// Side of an opened position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("LONG"),
            Direction::Short => f.write_str("SHORT"),
        }
    }
}

/// Descriptive market condition. Not consumed by the backtester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Downtrend,
    Uptrend,
    HighVolChop,
    LowVolRange,
}

impl Regime {
    pub fn code(self) -> u8 {
        match self {
            Regime::Downtrend => 0,
            Regime::Uptrend => 1,
            Regime::HighVolChop => 2,
            Regime::LowVolRange => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, LabelCodeError> {
        match code {
            0 => Ok(Regime::Downtrend),
            1 => Ok(Regime::Uptrend),
            2 => Ok(Regime::HighVolChop),
            3 => Ok(Regime::LowVolRange),
            _ => Err(LabelCodeError::UnknownCode { kind: "regime", code }),
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Downtrend => "DOWNTREND",
            Regime::Uptrend => "UPTREND",
            Regime::HighVolChop => "HIGH_VOL_CHOP",
            Regime::LowVolRange => "LOW_VOL_RANGE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_codes_roundtrip() {
        for label in [Label::Sell, Label::Hold, Label::Buy] {
            assert_eq!(Label::from_code(label.code() as i64).unwrap(), label);
        }
        assert_eq!(Label::from_code(0).unwrap(), Label::Sell);
        assert_eq!(Label::from_code(2).unwrap(), Label::Buy);
    }

    #[test]
    fn unknown_label_code_rejected() {
        let err = Label::from_code(-1).unwrap_err();
        assert_eq!(err, LabelCodeError::UnknownCode { kind: "label", code: -1 });
        assert!(Label::from_code(3).is_err());
    }

    #[test]
    fn hold_has_no_direction() {
        assert_eq!(Label::Hold.direction(), None);
        assert_eq!(Label::Buy.direction(), Some(Direction::Long));
        assert_eq!(Label::Sell.direction(), Some(Direction::Short));
    }

    #[test]
    fn label_parses_names_and_codes() {
        assert_eq!("buy".parse::<Label>().unwrap(), Label::Buy);
        assert_eq!(" SELL ".parse::<Label>().unwrap(), Label::Sell);
        assert_eq!("1".parse::<Label>().unwrap(), Label::Hold);
        assert_eq!("7".parse::<Label>().unwrap_err().to_string(), "unknown label code: 7");
    }

    #[test]
    fn unparseable_label_reports_input() {
        let err = " maybe ".parse::<Label>().unwrap_err();
        assert_eq!(
            err,
            LabelCodeError::Unrecognized {
                kind: "label",
                input: "maybe".to_string()
            }
        );
        assert_eq!(err.to_string(), "unrecognized label 'maybe'");
    }

    #[test]
    fn regime_codes() {
        assert_eq!(Regime::from_code(1).unwrap(), Regime::Uptrend);
        assert_eq!(Regime::HighVolChop.code(), 2);
        assert!(Regime::from_code(4).is_err());
        assert_eq!(Regime::LowVolRange.to_string(), "LOW_VOL_RANGE");
    }
}
