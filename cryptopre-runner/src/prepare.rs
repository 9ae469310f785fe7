//! File-level data preparation stages.
//!
//! ```text
//! raw_<sym>.csv  --features-->  feat_<sym>.csv  --regime-->  feat_<sym>.csv (+ regime)
//! feat_<sym>.csv --label----->  labeled_<sym>.csv
//! ```
//!
//! Each stage processes every matching file independently. A file that
//! fails (unreadable, missing columns) is logged and skipped; a stage with
//! no matching files at all is an error.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use cryptopre_core::domain::{FeatureBar, Regime};
use cryptopre_core::indicators::FeatureSet;
use cryptopre_core::labeling::{label_rows_with_returns, BarClassifier};

use crate::batch::{
    discover_inputs, BatchError, SymbolInput, LABELED_PREFIX, SMALL_DATASET_ROWS,
};
use crate::config::PipelineConfig;
use crate::data_loader::{load_feature_rows, load_raw_bars};
use crate::export::{render_feature_csv, render_labeled_csv, write_file, LabeledRecord};

pub const RAW_PREFIX: &str = "raw_";
pub const FEATURE_PREFIX: &str = "feat_";

/// Per-file result of a preparation stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub symbol: String,
    /// Rows written, or the reason the file was skipped.
    pub result: Result<usize, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: &'static str,
    pub files: Vec<FileOutcome>,
}

impl StageSummary {
    pub fn processed(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files.len() - self.processed()
    }
}

fn run_stage<F>(
    stage: &'static str,
    dir: &Path,
    prefix: &str,
    parallel: bool,
    process: F,
) -> Result<StageSummary, BatchError>
where
    F: Fn(&SymbolInput) -> Result<usize, String> + Sync,
{
    let inputs = discover_inputs(dir, prefix)?;
    if inputs.is_empty() {
        return Err(BatchError::NoInputFiles {
            prefix: prefix.to_string(),
            dir: dir.to_path_buf(),
        });
    }
    info!(stage, files = inputs.len(), "starting stage");

    let one = |input: &SymbolInput| {
        info!(stage, symbol = %input.symbol, "[PROCESS] {}", input.path.display());
        let result = process(input);
        match &result {
            Ok(rows) => info!(stage, symbol = %input.symbol, rows, "file done"),
            Err(reason) => warn!(stage, symbol = %input.symbol, reason = %reason, "file skipped"),
        }
        FileOutcome {
            symbol: input.symbol.clone(),
            result,
        }
    };

    let mut files: Vec<FileOutcome> = if parallel {
        inputs.par_iter().map(one).collect()
    } else {
        inputs.iter().map(one).collect()
    };
    files.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(StageSummary { stage, files })
}

/// `raw_<sym>.csv` → `feat_<sym>.csv` with warmup rows dropped.
pub fn build_features(config: &PipelineConfig) -> Result<StageSummary, BatchError> {
    let features = FeatureSet::default();
    let out_dir = &config.paths.data_dir;
    run_stage(
        "features",
        &config.paths.raw_dir,
        RAW_PREFIX,
        config.backtest.parallel,
        |input| {
            let bars = load_raw_bars(&input.path).map_err(|e| e.to_string())?;
            let rows = features.compute_complete(&bars);
            if rows.is_empty() {
                return Err(format!(
                    "{} bars do not cover the {}-bar warmup",
                    bars.len(),
                    features.lookback()
                ));
            }
            let path = out_dir.join(format!("{FEATURE_PREFIX}{}.csv", input.symbol));
            let csv = render_feature_csv(&rows, None).map_err(|e| e.to_string())?;
            write_file(&path, &csv).map_err(|e| e.to_string())?;
            Ok(rows.len())
        },
    )
}

/// Add (or replace) the `regime` column in every feature file.
pub fn add_regimes(config: &PipelineConfig) -> Result<StageSummary, BatchError> {
    let classifier = config.regime_classifier();
    run_stage(
        "regime",
        &config.paths.data_dir,
        FEATURE_PREFIX,
        config.backtest.parallel,
        |input| {
            let rows = feature_rows(&input.path)?;
            let regimes = classifier.classify(&rows).map_err(|e| e.to_string())?;
            let csv =
                render_feature_csv(&rows, Some(regimes.as_slice())).map_err(|e| e.to_string())?;
            write_file(&input.path, &csv).map_err(|e| e.to_string())?;
            Ok(rows.len())
        },
    )
}

/// `feat_<sym>.csv` → `labeled_<sym>.csv`, dropping the unlabeled tail.
pub fn label_features(config: &PipelineConfig) -> Result<StageSummary, BatchError> {
    let labeler = config.labeler();
    let out_dir = &config.paths.data_dir;
    run_stage(
        "label",
        &config.paths.data_dir,
        FEATURE_PREFIX,
        config.backtest.parallel,
        |input| {
            let loaded = load_feature_rows(&input.path).map_err(|e| e.to_string())?;
            let (rows, regimes): (Vec<FeatureBar>, Vec<Option<Regime>>) =
                loaded.into_iter().unzip();
            let labeled =
                label_rows_with_returns(&rows, &labeler, None).map_err(|e| e.to_string())?;

            let records: Vec<LabeledRecord> = labeled
                .into_iter()
                .zip(rows.iter().zip(regimes))
                .map(|((labeled, future_return), (row, regime))| LabeledRecord {
                    row: *row,
                    regime,
                    future_return,
                    label: labeled.label,
                })
                .collect();

            if records.len() < SMALL_DATASET_ROWS {
                warn!(
                    symbol = %input.symbol,
                    rows = records.len(),
                    "labeling produced a very small dataset"
                );
            }

            let path = out_dir.join(format!("{LABELED_PREFIX}{}.csv", input.symbol));
            let csv = render_labeled_csv(&records).map_err(|e| e.to_string())?;
            write_file(&path, &csv).map_err(|e| e.to_string())?;
            Ok(records.len())
        },
    )
}

fn feature_rows(path: &Path) -> Result<Vec<FeatureBar>, String> {
    Ok(load_feature_rows(path)
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|(row, _)| row)
        .collect())
}
