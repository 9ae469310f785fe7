//! CryptoPre Runner: file I/O, configuration and batch orchestration.
//!
//! This crate builds on `cryptopre-core` to provide:
//! - CSV loading with case-insensitive schema validation
//! - TOML pipeline configuration
//! - Feature, regime and label stages over per-symbol files
//! - Multi-symbol backtest batch (rayon) with CSV artifacts
//! - Ordered stage pipeline that stops at the first failure
//! - Seeded synthetic bars for demos and tests

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod prepare;
pub mod stages;
pub mod synthetic;

pub use batch::{
    discover_inputs, run_batch, run_symbol, BatchError, BatchReport, SymbolInput, SymbolReport,
    SymbolStatus,
};
pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{dataset_hash, load_feature_rows, load_labeled_bars, load_raw_bars, LoadError};
pub use export::{ArtifactPaths, ExportError};
pub use prepare::{add_regimes, build_features, label_features, StageSummary};
pub use stages::{standard_pipeline, Pipeline, StageError, StageReport};
pub use synthetic::{generate_bars, SyntheticConfig};
