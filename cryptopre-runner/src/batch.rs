//! Multi-symbol backtest driver.
//!
//! Discovers `labeled_<symbol>.csv` files, backtests each one independently
//! (on the rayon pool when enabled) and writes that symbol's artifacts.
//! Reports are collected after the parallel section and sorted by symbol.
//! A failing symbol is reported and skipped; only "no inputs" stops the batch.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use cryptopre_core::backtest::Backtester;
use cryptopre_core::metrics::BacktestSummary;

use crate::config::PipelineConfig;
use crate::data_loader::{dataset_hash, load_labeled_bars};
use crate::export::{write_backtest_artifacts, ArtifactPaths};

/// Input file prefix for the backtest stage.
pub const LABELED_PREFIX: &str = "labeled_";

/// Fewer labeled rows than this triggers a warning.
pub const SMALL_DATASET_ROWS: usize = 100;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no {prefix}*.csv input files found in {dir}")]
    NoInputFiles { prefix: String, dir: PathBuf },

    #[error("failed to list {dir}: {source}")]
    ListDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInput {
    pub symbol: String,
    pub path: PathBuf,
}

/// Find `<prefix><symbol>.csv` files in `dir`, sorted by symbol.
pub fn discover_inputs(dir: &Path, prefix: &str) -> Result<Vec<SymbolInput>, BatchError> {
    let list_err = |source| BatchError::ListDir {
        dir: dir.to_path_buf(),
        source,
    };
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let symbol = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".csv"))
            .filter(|s| !s.is_empty());
        if let Some(symbol) = symbol {
            inputs.push(SymbolInput {
                symbol: symbol.to_string(),
                path: path.clone(),
            });
        }
    }
    inputs.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(inputs)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolStatus {
    Completed,
    Failed(String),
}

/// Result of backtesting one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub input: PathBuf,
    pub status: SymbolStatus,
    pub rows: usize,
    /// Non-HOLD bars skipped for invalid levels or an unusable next bar.
    pub skipped: usize,
    pub dataset_hash: Option<String>,
    pub summary: Option<BacktestSummary>,
    pub artifacts: Option<ArtifactPaths>,
}

impl SymbolReport {
    fn failed(input: &SymbolInput, msg: String) -> Self {
        Self {
            symbol: input.symbol.clone(),
            input: input.path.clone(),
            status: SymbolStatus::Failed(msg),
            rows: 0,
            skipped: 0,
            dataset_hash: None,
            summary: None,
            artifacts: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SymbolStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub reports: Vec<SymbolReport>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.completed()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Backtest one labeled file and write its artifacts.
pub fn run_symbol(
    input: &SymbolInput,
    backtester: &Backtester,
    results_dir: &Path,
) -> SymbolReport {
    info!(symbol = %input.symbol, "[BACKTEST] {}", input.path.display());

    let bars = match load_labeled_bars(&input.path) {
        Ok(bars) => bars,
        Err(e) => {
            warn!(symbol = %input.symbol, error = %e, "failed to load input");
            return SymbolReport::failed(input, e.to_string());
        }
    };
    if bars.len() < SMALL_DATASET_ROWS {
        warn!(symbol = %input.symbol, rows = bars.len(), "very small dataset");
    }

    let run = backtester.run(&bars);
    let summary = run.summary();

    let artifacts = match write_backtest_artifacts(results_dir, &input.symbol, &run, &summary) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(symbol = %input.symbol, error = %e, "failed to write artifacts");
            return SymbolReport::failed(input, e.to_string());
        }
    };

    info!(
        symbol = %input.symbol,
        trades = summary.total_trades,
        accuracy = summary.accuracy_pct,
        final_balance = summary.final_balance,
        "backtest complete"
    );

    SymbolReport {
        symbol: input.symbol.clone(),
        input: input.path.clone(),
        status: SymbolStatus::Completed,
        rows: bars.len(),
        skipped: run.skipped,
        dataset_hash: Some(dataset_hash(&input.symbol, &bars)),
        summary: Some(summary),
        artifacts: Some(artifacts),
    }
}

/// Backtest every labeled file in `config.paths.data_dir`.
pub fn run_batch(config: &PipelineConfig) -> Result<BatchReport, BatchError> {
    let data_dir = &config.paths.data_dir;
    let inputs = discover_inputs(data_dir, LABELED_PREFIX)?;
    if inputs.is_empty() {
        return Err(BatchError::NoInputFiles {
            prefix: LABELED_PREFIX.to_string(),
            dir: data_dir.clone(),
        });
    }

    let backtester = Backtester::new(config.backtest.engine);
    let results_dir = config.paths.results_dir.as_path();
    info!(
        files = inputs.len(),
        parallel = config.backtest.parallel,
        policy = backtester.policy_name(),
        "starting batch backtest"
    );

    let mut reports: Vec<SymbolReport> = if config.backtest.parallel {
        inputs
            .par_iter()
            .map(|input| run_symbol(input, &backtester, results_dir))
            .collect()
    } else {
        inputs
            .iter()
            .map(|input| run_symbol(input, &backtester, results_dir))
            .collect()
    };
    reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let report = BatchReport { reports };
    info!(
        completed = report.completed(),
        failed = report.failed(),
        "batch backtest finished"
    );
    Ok(report)
}
