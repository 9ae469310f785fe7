//! Single-symbol backtest loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::equity::EquityState;
use crate::domain::{Direction, LabeledBar, TradeLevels, TradeOutcome, TradeRecord};
use crate::levels::{AtrBracket, LevelPolicy};
use crate::metrics::BacktestSummary;

/// Accounting parameters for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    /// Balance factor applied on TP_HIT.
    pub win_multiplier: f64,
    /// Balance factor applied on SL_HIT.
    pub loss_multiplier: f64,
    /// First bar index eligible for a decision.
    pub start_index: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000.0,
            win_multiplier: 1.02,
            loss_multiplier: 0.985,
            start_index: 1,
        }
    }
}

/// Trade log and equity of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub trades: Vec<TradeRecord>,
    pub equity: EquityState,
    /// Non-HOLD bars skipped because their levels could not be computed or
    /// the next bar's range is unusable.
    pub skipped: usize,
}

impl BacktestRun {
    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary::compute(&self.trades, self.equity.curve(), self.equity.initial())
    }
}

/// Resolve a decision against the next bar's range.
///
/// The stop is checked first: a bar that touches both levels is a loss.
pub fn resolve_outcome(levels: &TradeLevels, next_high: f64, next_low: f64) -> TradeOutcome {
    match levels.direction {
        Direction::Long => {
            if next_low <= levels.stop_loss {
                TradeOutcome::SlHit
            } else if next_high >= levels.take_profit {
                TradeOutcome::TpHit
            } else {
                TradeOutcome::None
            }
        }
        Direction::Short => {
            if next_high >= levels.stop_loss {
                TradeOutcome::SlHit
            } else if next_low <= levels.take_profit {
                TradeOutcome::TpHit
            } else {
                TradeOutcome::None
            }
        }
    }
}

/// Deterministic replay of a labeled bar sequence.
pub struct Backtester {
    config: BacktestConfig,
    policy: Box<dyn LevelPolicy>,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            policy: Box::new(AtrBracket::default()),
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn LevelPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Run over `bars`, which must be in timestamp order.
    ///
    /// Decisions are taken on bars `start_index ..= len - 2`; the last bar is
    /// only ever used as lookahead.
    pub fn run(&self, bars: &[LabeledBar]) -> BacktestRun {
        let cfg = &self.config;
        let mut equity = EquityState::new(cfg.initial_balance);
        let mut trades = Vec::new();
        let mut skipped = 0usize;

        for i in cfg.start_index..bars.len().saturating_sub(1) {
            let row = &bars[i];
            let entry = row.bar.close;
            let atr = row.atr.unwrap_or(f64::NAN);

            let levels = match self.policy.levels(entry, atr, row.label) {
                Ok(Some(levels)) => levels,
                Ok(None) => continue,
                Err(e) => {
                    warn!(index = i, error = %e, "skipping bar: cannot compute levels");
                    skipped += 1;
                    continue;
                }
            };

            let next = &bars[i + 1].bar;
            if !next.has_finite_range() {
                warn!(index = i, "skipping bar: next bar has no usable high/low");
                skipped += 1;
                continue;
            }
            let outcome = resolve_outcome(&levels, next.high, next.low);
            equity.apply(outcome, cfg.win_multiplier, cfg.loss_multiplier);

            debug!(
                index = i,
                direction = %levels.direction,
                entry,
                sl = levels.stop_loss,
                tp = levels.take_profit,
                outcome = %outcome,
                balance = equity.balance(),
                "trade resolved"
            );

            trades.push(TradeRecord {
                index: i,
                entry,
                stop_loss: levels.stop_loss,
                take_profit: levels.take_profit,
                direction: levels.direction,
                outcome,
            });
        }

        BacktestRun {
            trades,
            equity,
            skipped,
        }
    }
}
