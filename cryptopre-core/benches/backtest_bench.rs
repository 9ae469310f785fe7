//! Criterion benchmarks for the signal engine hot paths.
//!
//! Benchmarks:
//! 1. Backtest loop over labeled bars
//! 2. Feature computation (EMA/RSI/MACD/ATR batch)
//! 3. Forward-return labeling plus regime tagging

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cryptopre_core::backtest::{BacktestConfig, Backtester};
use cryptopre_core::domain::{Bar, FeatureBar, Label, LabeledBar};
use cryptopre_core::indicators::FeatureSet;
use cryptopre_core::labeling::{label_rows, ForwardReturnLabeler, RegimeClassifier};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                timestamp: i as i64 * 60_000,
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

fn make_labeled(n: usize) -> Vec<LabeledBar> {
    make_bars(n)
        .into_iter()
        .enumerate()
        .map(|(i, bar)| {
            let label = match i % 3 {
                0 => Label::Buy,
                1 => Label::Hold,
                _ => Label::Sell,
            };
            LabeledBar::new(bar, Some(1.0), label)
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest_loop");
    let bt = Backtester::new(BacktestConfig::default());
    for n in [1_000, 10_000, 100_000] {
        let bars = make_labeled(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| bt.run(black_box(bars)))
        });
    }
    group.finish();
}

fn bench_features(c: &mut Criterion) {
    let bars = make_bars(10_000);
    let fs = FeatureSet::default();
    c.bench_function("features_10k", |b| b.iter(|| fs.compute(black_box(&bars))));
}

fn bench_labeling(c: &mut Criterion) {
    let rows: Vec<FeatureBar> = FeatureSet::default().compute_complete(&make_bars(10_000));
    let labeler = ForwardReturnLabeler::default();
    let regimes = RegimeClassifier::default();
    c.bench_function("label_rows_10k", |b| {
        b.iter(|| label_rows(black_box(&rows), &labeler, Some(&regimes)))
    });
}

criterion_group!(benches, bench_backtest, bench_features, bench_labeling);
criterion_main!(benches);
