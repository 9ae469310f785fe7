//! Domain types for the CryptoPre engine

pub mod bar;
pub mod label;
pub mod trade;

pub use bar::{Bar, FeatureBar, Features, LabeledBar};
pub use label::{Direction, Label, LabelCodeError, Regime};
pub use trade::{TradeLevels, TradeOutcome, TradeRecord};

/// Symbol type alias
pub type Symbol = String;
