//! End-to-end: raw bars → features → labels/regimes → backtest → summary.

use cryptopre_core::backtest::{BacktestConfig, Backtester};
use cryptopre_core::domain::{Bar, Label, LabeledBar, Regime, TradeOutcome};
use cryptopre_core::indicators::FeatureSet;
use cryptopre_core::labeling::{label_rows, ForwardReturnLabeler, RegimeClassifier};
use cryptopre_core::metrics::BacktestSummary;

fn wave_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.15).sin() * 8.0 + i as f64 * 0.02;
            let open = close - 0.2;
            Bar {
                timestamp: 1_700_000_000_000 + i as i64 * 3_600_000,
                open,
                high: close + 0.9,
                low: close - 0.9,
                close,
                volume: 500.0,
            }
        })
        .collect()
}

fn labeled(close: f64, high: f64, low: f64, atr: Option<f64>, label: Label) -> LabeledBar {
    LabeledBar::new(
        Bar {
            timestamp: 0,
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        },
        atr,
        label,
    )
}

fn from_first_bar() -> Backtester {
    Backtester::new(BacktestConfig {
        start_index: 0,
        ..BacktestConfig::default()
    })
}

#[test]
fn full_pipeline_on_synthetic_wave() {
    let bars = wave_bars(400);
    let features = FeatureSet::default();
    let rows = features.compute_complete(&bars);
    assert_eq!(rows.len(), bars.len() - features.lookback());
    assert!(rows.iter().all(|r| r.features.is_complete()));

    let labeled = label_rows(
        &rows,
        &ForwardReturnLabeler::default(),
        Some(&RegimeClassifier::default()),
    )
    .unwrap();
    assert_eq!(labeled.len(), rows.len() - 1);
    assert!(labeled.iter().all(|b| b.regime.is_some()));

    let run = Backtester::new(BacktestConfig::default()).run(&labeled);
    let summary = run.summary();
    assert!(summary.total_trades > 0);
    assert_eq!(run.skipped, 0);
    assert_eq!(summary.wins + summary.losses + count_none(&run.trades), summary.total_trades);
    assert_eq!(summary.final_balance, *run.equity.curve().last().unwrap());
}

fn count_none(trades: &[cryptopre_core::domain::TradeRecord]) -> usize {
    trades.iter().filter(|t| t.outcome == TradeOutcome::None).count()
}

#[test]
fn buy_then_take_profit() {
    let bars = vec![
        labeled(100.0, 100.0, 100.0, Some(2.0), Label::Buy),
        labeled(100.0, 106.0, 100.0, Some(2.0), Label::Hold),
        labeled(106.0, 106.0, 106.0, Some(2.0), Label::Hold),
    ];
    let run = from_first_bar().run(&bars);
    let t = run.trades[0];
    assert_eq!((t.stop_loss, t.take_profit), (97.0, 104.0));
    assert_eq!(t.outcome, TradeOutcome::TpHit);
    assert!((run.equity.balance() - 1020.0).abs() < 1e-9);
}

#[test]
fn stop_wins_when_both_levels_touched() {
    let bars = vec![
        labeled(100.0, 100.0, 100.0, Some(2.0), Label::Buy),
        labeled(100.0, 105.0, 96.0, Some(2.0), Label::Hold),
        labeled(106.0, 106.0, 106.0, Some(2.0), Label::Hold),
    ];
    let run = from_first_bar().run(&bars);
    assert_eq!(run.trades[0].outcome, TradeOutcome::SlHit);
    assert!((run.equity.balance() - 985.0).abs() < 1e-9);
}

#[test]
fn all_hold_sequence_is_flat() {
    let bars: Vec<_> = (0..10)
        .map(|_| labeled(100.0, 101.0, 99.0, Some(1.0), Label::Hold))
        .collect();
    let summary = from_first_bar().run(&bars).summary();
    assert_eq!(summary, BacktestSummary::empty(1000.0));
    assert_eq!(summary.return_pct, 0.0);
    assert_eq!(summary.max_drawdown_pct, 0.0);
}

#[test]
fn missing_atr_skips_without_trading() {
    let bars = vec![
        labeled(100.0, 100.0, 100.0, None, Label::Sell),
        labeled(100.0, 100.0, 90.0, Some(1.0), Label::Hold),
    ];
    let run = from_first_bar().run(&bars);
    assert!(run.trades.is_empty());
    assert_eq!(run.skipped, 1);
}

#[test]
fn uptrend_regardless_of_volatility() {
    let rc = RegimeClassifier::default();
    assert_eq!(rc.regime_for(10.0, 9.0, 8.0, 0.5), Regime::Uptrend);
    assert_eq!(rc.regime_for(10.0, 9.0, 8.0, 0.001), Regime::Uptrend);
}
