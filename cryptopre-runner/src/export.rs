//! CSV artifact generation.
//!
//! Per backtested symbol, three files land in the results directory:
//! - `summary_<symbol>.csv`: one-row [`BacktestSummary`]
//! - `log_<symbol>.csv`: trade log (`Index, Entry, SL, TP, Outcome`)
//! - `equity_<symbol>.csv`: balance after each trade (`Trade, Balance`)
//!
//! The feature and label stages write their intermediate tables here too.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use cryptopre_core::backtest::BacktestRun;
use cryptopre_core::domain::{Bar, FeatureBar, Features, Label, Regime, TradeRecord};
use cryptopre_core::metrics::BacktestSummary;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One row of a `labeled_<symbol>.csv` file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledRecord {
    pub row: FeatureBar,
    pub regime: Option<Regime>,
    pub future_return: f64,
    pub label: Label,
}

/// Paths of the three per-symbol backtest artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub summary: PathBuf,
    pub log: PathBuf,
    pub equity: PathBuf,
}

impl ArtifactPaths {
    pub fn for_symbol(results_dir: &Path, symbol: &str) -> Self {
        Self {
            summary: results_dir.join(format!("summary_{symbol}.csv")),
            log: results_dir.join(format!("log_{symbol}.csv")),
            equity: results_dir.join(format!("equity_{symbol}.csv")),
        }
    }
}

const BAR_HEADERS: [&str; 6] = ["timestamp", "Open", "High", "Low", "Close", "Volume"];

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    String::from_utf8(data).map_err(|e| ExportError::Flush(e.to_string()))
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn bar_cells(bar: &Bar) -> [String; 6] {
    [
        bar.timestamp.to_string(),
        bar.open.to_string(),
        bar.high.to_string(),
        bar.low.to_string(),
        bar.close.to_string(),
        bar.volume.to_string(),
    ]
}

fn feature_cells(f: &Features) -> impl Iterator<Item = String> {
    f.columns().into_iter().map(|(_, v)| opt(v))
}

fn feature_headers() -> impl Iterator<Item = &'static str> {
    Features::default().columns().into_iter().map(|(name, _)| name)
}

/// Plain OHLCV table, readable by [`crate::data_loader::load_raw_bars`].
pub fn render_bars_csv(bars: &[Bar]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(BAR_HEADERS)?;
    for bar in bars {
        wtr.write_record(bar_cells(bar))?;
    }
    finish(wtr)
}

pub fn render_summary_csv(summary: &BacktestSummary) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.serialize(summary)?;
    finish(wtr)
}

pub fn render_trade_log_csv(trades: &[TradeRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Index", "Entry", "SL", "TP", "Outcome"])?;
    for t in trades {
        wtr.write_record([
            t.index.to_string(),
            t.entry.to_string(),
            t.stop_loss.to_string(),
            t.take_profit.to_string(),
            t.outcome.as_str().to_string(),
        ])?;
    }
    finish(wtr)
}

/// Row 0 is the initial balance; row `k` the balance after trade `k`.
pub fn render_equity_csv(curve: &[f64]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Trade", "Balance"])?;
    for (i, balance) in curve.iter().enumerate() {
        wtr.write_record([i.to_string(), balance.to_string()])?;
    }
    finish(wtr)
}

/// Bars plus indicator columns, with an optional `regime` code column.
pub fn render_feature_csv(
    rows: &[FeatureBar],
    regimes: Option<&[Regime]>,
) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header: Vec<&str> = BAR_HEADERS.to_vec();
    header.extend(feature_headers());
    if regimes.is_some() {
        header.push("regime");
    }
    wtr.write_record(&header)?;

    for (i, row) in rows.iter().enumerate() {
        let mut record: Vec<String> = bar_cells(&row.bar).into();
        record.extend(feature_cells(&row.features));
        if let Some(r) = regimes {
            record.push(r.get(i).map(|g| g.code().to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

pub fn render_labeled_csv(records: &[LabeledRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header: Vec<&str> = BAR_HEADERS.to_vec();
    header.extend(feature_headers());
    header.extend(["regime", "future_return", "label"]);
    wtr.write_record(&header)?;

    for rec in records {
        let mut record: Vec<String> = bar_cells(&rec.row.bar).into();
        record.extend(feature_cells(&rec.row.features));
        record.push(rec.regime.map(|g| g.code().to_string()).unwrap_or_default());
        record.push(rec.future_return.to_string());
        record.push(rec.label.code().to_string());
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, content).map_err(io_err)
}

/// Write the summary, trade log and equity curve of one run.
pub fn write_backtest_artifacts(
    results_dir: &Path,
    symbol: &str,
    run: &BacktestRun,
    summary: &BacktestSummary,
) -> Result<ArtifactPaths, ExportError> {
    let paths = ArtifactPaths::for_symbol(results_dir, symbol);
    write_file(&paths.summary, &render_summary_csv(summary)?)?;
    write_file(&paths.log, &render_trade_log_csv(&run.trades)?)?;
    write_file(&paths.equity, &render_equity_csv(run.equity.curve())?)?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptopre_core::domain::{Direction, TradeOutcome};

    fn trade(index: usize, outcome: TradeOutcome) -> TradeRecord {
        TradeRecord {
            index,
            entry: 100.0,
            stop_loss: 97.0,
            take_profit: 104.0,
            direction: Direction::Long,
            outcome,
        }
    }

    #[test]
    fn summary_uses_display_headers() {
        let csv = render_summary_csv(&BacktestSummary::empty(1000.0)).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "Total Trades,Wins,Losses,Accuracy %,Profit Factor,Max Drawdown %,Final Balance,Return %"
        );
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn trade_log_columns() {
        let trades = [trade(3, TradeOutcome::TpHit), trade(5, TradeOutcome::None)];
        let csv = render_trade_log_csv(&trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Index,Entry,SL,TP,Outcome");
        assert_eq!(lines[1], "3,100,97,104,TP");
        assert_eq!(lines[2], "5,100,97,104,NONE");
    }

    #[test]
    fn equity_rows_start_at_zero() {
        let csv = render_equity_csv(&[1000.0, 1020.0]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, ["Trade,Balance", "0,1000", "1,1020"]);
    }

    #[test]
    fn feature_csv_leaves_missing_cells_empty() {
        let row = FeatureBar {
            bar: Bar {
                timestamp: 7,
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 10.0,
            },
            features: Features {
                ema_9: Some(1.25),
                ..Features::default()
            },
        };
        let csv = render_feature_csv(&[row], Some(&[Regime::LowVolRange][..])).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].ends_with("atr_pct,regime"));
        assert_eq!(lines[1], "7,1,2,0.5,1.5,10,1.25,,,,,,,,3");
    }

    #[test]
    fn write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/summary_X.csv");
        write_file(&path, "a,b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
