//! Backtest simulator: replays labeled bars one decision at a time.
//!
//! Per decision bar: bracket the close with SL/TP, look one bar ahead, and
//! resolve `PENDING → {TP_HIT | SL_HIT | NONE}` in a single step. There is
//! no re-entry, partial fill, or trailing stop. Balance moves by fixed
//! multipliers, independent of the SL/TP distances.

pub mod equity;
pub mod simulator;

pub use equity::EquityState;
pub use simulator::{resolve_outcome, BacktestConfig, BacktestRun, Backtester};
