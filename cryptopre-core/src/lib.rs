//! CryptoPre Core: bars, indicators, labelers, SL/TP levels, backtest simulator, metrics.
//!
//! This crate holds the deterministic signal engine:
//! - Domain types (bars, feature rows, labels, regimes, trade records)
//! - Indicator pipeline producing the EMA/RSI/MACD/ATR feature columns
//! - Forward-return labeler and rule-based regime classifier
//! - Level policies bracketing an entry with stop-loss and take-profit
//! - Single-symbol backtest loop with multiplicative equity accounting
//! - Summary metrics, live signal assembly and the symbol lookup table
//!
//! Nothing here touches the filesystem except [`symbols::SymbolTable::from_file`].

pub mod backtest;
pub mod domain;
pub mod indicators;
pub mod labeling;
pub mod levels;
pub mod metrics;
pub mod signal;
pub mod symbols;
