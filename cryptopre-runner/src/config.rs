//! Pipeline configuration, stored as TOML.
//!
//! Every section is optional; missing keys take the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cryptopre_core::backtest::BacktestConfig;
use cryptopre_core::labeling::{ForwardReturnLabeler, RegimeClassifier};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds `feat_*`/`labeled_*` files.
    pub data_dir: PathBuf,
    /// Holds `raw_*` files.
    pub raw_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/processed"),
            raw_dir: PathBuf::from("data/raw"),
            results_dir: PathBuf::from("backtest_results"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub future_step: usize,
    pub threshold: f64,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        let d = ForwardReturnLabeler::default();
        Self {
            future_step: d.future_step,
            threshold: d.threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub high_vol_atr_pct: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            high_vol_atr_pct: RegimeClassifier::default().high_vol_atr_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchBacktestConfig {
    #[serde(flatten)]
    pub engine: BacktestConfig,
    /// Run symbols on the rayon pool.
    pub parallel: bool,
}

impl Default for BatchBacktestConfig {
    fn default() -> Self {
        Self {
            engine: BacktestConfig::default(),
            parallel: true,
        }
    }
}

/// The complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub labeling: LabelingConfig,
    pub regime: RegimeConfig,
    pub backtest: BatchBacktestConfig,
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bt = &self.backtest.engine;
        if !bt.initial_balance.is_finite() || bt.initial_balance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_balance must be positive, got {}",
                bt.initial_balance
            )));
        }
        for (name, m) in [
            ("win_multiplier", bt.win_multiplier),
            ("loss_multiplier", bt.loss_multiplier),
        ] {
            if !m.is_finite() || m <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {m}")));
            }
        }
        if self.labeling.future_step == 0 {
            return Err(ConfigError::Invalid("future_step must be at least 1".into()));
        }
        if !self.labeling.threshold.is_finite() || self.labeling.threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "threshold must be non-negative, got {}",
                self.labeling.threshold
            )));
        }
        if !self.regime.high_vol_atr_pct.is_finite() || self.regime.high_vol_atr_pct < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "high_vol_atr_pct must be non-negative, got {}",
                self.regime.high_vol_atr_pct
            )));
        }
        Ok(())
    }

    pub fn labeler(&self) -> ForwardReturnLabeler {
        ForwardReturnLabeler::new(self.labeling.future_step, self.labeling.threshold)
    }

    pub fn regime_classifier(&self) -> RegimeClassifier {
        RegimeClassifier {
            high_vol_atr_pct: self.regime.high_vol_atr_pct,
        }
    }
}
