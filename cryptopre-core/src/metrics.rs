//! Summary metrics: pure reductions over the trade log and equity curve.
//!
//! `profit_factor` is a trade-count ratio (wins / losses), not gross profit
//! over gross loss. `max_drawdown_pct` measures the deepest dip below the
//! initial balance, not peak-to-trough.

use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;

/// One-row summary of a backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    #[serde(rename = "Total Trades")]
    pub total_trades: usize,
    #[serde(rename = "Wins")]
    pub wins: usize,
    #[serde(rename = "Losses")]
    pub losses: usize,
    #[serde(rename = "Accuracy %")]
    pub accuracy_pct: f64,
    #[serde(rename = "Profit Factor")]
    pub profit_factor: f64,
    #[serde(rename = "Max Drawdown %")]
    pub max_drawdown_pct: f64,
    #[serde(rename = "Final Balance")]
    pub final_balance: f64,
    #[serde(rename = "Return %")]
    pub return_pct: f64,
}

impl BacktestSummary {
    /// Compute the summary. An empty log yields zero-valued metrics and
    /// `final_balance == initial_balance`.
    pub fn compute(trades: &[TradeRecord], equity_curve: &[f64], initial_balance: f64) -> Self {
        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let losses = trades.iter().filter(|t| t.is_loser()).count();
        let final_balance = equity_curve.last().copied().unwrap_or(initial_balance);

        Self {
            total_trades,
            wins,
            losses,
            accuracy_pct: accuracy_pct(wins, total_trades),
            profit_factor: profit_factor(wins, losses),
            max_drawdown_pct: max_drawdown_pct(equity_curve, initial_balance),
            final_balance,
            return_pct: return_pct(final_balance, initial_balance),
        }
    }

    /// Summary of a run with no decisions.
    pub fn empty(initial_balance: f64) -> Self {
        Self::compute(&[], &[initial_balance], initial_balance)
    }
}

/// 100 · wins / trades; 0 when there are no trades.
pub fn accuracy_pct(wins: usize, trades: usize) -> f64 {
    if trades == 0 {
        return 0.0;
    }
    100.0 * wins as f64 / trades as f64
}

/// wins / losses, or wins when there are no losses.
pub fn profit_factor(wins: usize, losses: usize) -> f64 {
    if losses > 0 {
        wins as f64 / losses as f64
    } else {
        wins as f64
    }
}

/// 100 · (initial − min(curve)) / initial.
pub fn max_drawdown_pct(equity_curve: &[f64], initial_balance: f64) -> f64 {
    if initial_balance <= 0.0 {
        return 0.0;
    }
    let trough = equity_curve.iter().copied().fold(initial_balance, f64::min);
    100.0 * (initial_balance - trough) / initial_balance
}

/// 100 · (final − initial) / initial.
pub fn return_pct(final_balance: f64, initial_balance: f64) -> f64 {
    if initial_balance <= 0.0 {
        return 0.0;
    }
    100.0 * (final_balance - initial_balance) / initial_balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, TradeOutcome};

    fn rec(outcome: TradeOutcome) -> TradeRecord {
        TradeRecord {
            index: 1,
            entry: 100.0,
            stop_loss: 97.0,
            take_profit: 104.0,
            direction: Direction::Long,
            outcome,
        }
    }

    #[test]
    fn empty_summary_is_zero() {
        let s = BacktestSummary::empty(1000.0);
        assert_eq!(s.total_trades, 0);
        assert_eq!(s.accuracy_pct, 0.0);
        assert_eq!(s.profit_factor, 0.0);
        assert_eq!(s.max_drawdown_pct, 0.0);
        assert_eq!(s.final_balance, 1000.0);
        assert_eq!(s.return_pct, 0.0);
    }

    #[test]
    fn profit_factor_is_count_ratio() {
        assert_eq!(profit_factor(3, 2), 1.5);
        assert_eq!(profit_factor(4, 0), 4.0);
        assert_eq!(profit_factor(0, 0), 0.0);
    }

    #[test]
    fn drawdown_from_initial_not_peak() {
        // Peak 1100 then trough 1050: peak-to-trough would be 4.5%, from initial it is 0.
        let curve = [1000.0, 1100.0, 1050.0];
        assert_eq!(max_drawdown_pct(&curve, 1000.0), 0.0);

        let curve = [1000.0, 1200.0, 900.0, 950.0];
        assert!((max_drawdown_pct(&curve, 1000.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn compute_mixed_log() {
        let trades = [
            rec(TradeOutcome::TpHit),
            rec(TradeOutcome::SlHit),
            rec(TradeOutcome::None),
            rec(TradeOutcome::TpHit),
        ];
        let curve = [1000.0, 1020.0, 1004.7, 1004.7, 1024.794];
        let s = BacktestSummary::compute(&trades, &curve, 1000.0);
        assert_eq!(s.total_trades, 4);
        assert_eq!(s.wins, 2);
        assert_eq!(s.losses, 1);
        assert_eq!(s.accuracy_pct, 50.0);
        assert_eq!(s.profit_factor, 2.0);
        assert_eq!(s.max_drawdown_pct, 0.0);
        assert!((s.return_pct - 2.4794).abs() < 1e-9);
    }

    #[test]
    fn summary_serializes_with_report_headers() {
        let json = serde_json::to_string(&BacktestSummary::empty(1000.0)).unwrap();
        assert!(json.contains("\"Total Trades\":0"));
        assert!(json.contains("\"Max Drawdown %\""));
    }
}
