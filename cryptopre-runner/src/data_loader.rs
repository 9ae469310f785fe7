//! CSV loading with schema validation.
//!
//! Three file kinds flow through the pipeline:
//! - `raw_<symbol>.csv`: OHLCV bars
//! - `feat_<symbol>.csv`: bars plus indicator columns (and optionally `regime`)
//! - `labeled_<symbol>.csv`: feature rows plus `label`
//!
//! Header matching is case-insensitive. A missing required column is reported
//! by name. Rows must be in strictly increasing timestamp order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use cryptopre_core::domain::{Bar, FeatureBar, Features, Label, LabeledBar, Regime};

/// Columns that may carry the bar time, in lookup order.
const TIME_COLUMNS: [&str; 5] = ["timestamp", "open_time", "datetime", "date", "time"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { column: &'static str, path: PathBuf },

    #[error("{path}: row {row}: invalid {column} value '{value}'")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        path: PathBuf,
    },

    #[error("{path}: row {row}: timestamp not after previous row")]
    UnorderedTimestamps { row: usize, path: PathBuf },
}

/// Lower-cased header → column index.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        Self { index }
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn require(&self, name: &'static str, path: &Path) -> Result<usize, LoadError> {
        self.optional(name).ok_or_else(|| LoadError::MissingColumn {
            column: name,
            path: path.to_path_buf(),
        })
    }

    fn time(&self) -> Option<usize> {
        TIME_COLUMNS.iter().find_map(|c| self.optional(c))
    }
}

struct BarColumns {
    time: Option<usize>,
    open: Option<usize>,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl BarColumns {
    /// `strict` also requires `Open` and `Volume`.
    fn resolve(cols: &Columns, path: &Path, strict: bool) -> Result<Self, LoadError> {
        let close = cols.require("close", path)?;
        let low = cols.require("low", path)?;
        let high = cols.require("high", path)?;
        let (open, volume) = if strict {
            (
                Some(cols.require("open", path)?),
                Some(cols.require("volume", path)?),
            )
        } else {
            (cols.optional("open"), cols.optional("volume"))
        };
        Ok(Self {
            time: cols.time(),
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

struct FeatureColumns([Option<usize>; 8]);

impl FeatureColumns {
    fn resolve(cols: &Columns) -> Self {
        let names = Features::default().columns().map(|(name, _)| cols.optional(name));
        Self(names)
    }
}

/// Row parser tied to one file, for error context.
struct RowReader<'a> {
    path: &'a Path,
    row: usize,
    record: &'a csv::StringRecord,
}

impl RowReader<'_> {
    fn cell(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("").trim()
    }

    fn invalid(&self, column: &str, idx: usize) -> LoadError {
        LoadError::InvalidValue {
            column: column.to_string(),
            row: self.row,
            value: self.cell(idx).to_string(),
            path: self.path.to_path_buf(),
        }
    }

    fn number(&self, column: &str, idx: usize) -> Result<f64, LoadError> {
        self.cell(idx).parse::<f64>().map_err(|_| self.invalid(column, idx))
    }

    /// Empty or NaN cells read as `None`.
    fn optional_number(&self, column: &str, idx: Option<usize>) -> Result<Option<f64>, LoadError> {
        let Some(idx) = idx else {
            return Ok(None);
        };
        let raw = self.cell(idx);
        if raw.is_empty() {
            return Ok(None);
        }
        let v = self.number(column, idx)?;
        Ok(v.is_finite().then_some(v))
    }

    fn code(&self, column: &str, idx: usize) -> Result<i64, LoadError> {
        let v = self.number(column, idx)?;
        if v.fract() != 0.0 || !v.is_finite() {
            return Err(self.invalid(column, idx));
        }
        Ok(v as i64)
    }

    fn timestamp(&self, idx: Option<usize>) -> Result<i64, LoadError> {
        let Some(idx) = idx else {
            return Ok(self.row as i64);
        };
        parse_timestamp(self.cell(idx)).ok_or_else(|| self.invalid("timestamp", idx))
    }

    fn bar(&self, c: &BarColumns) -> Result<Bar, LoadError> {
        Ok(Bar {
            timestamp: self.timestamp(c.time)?,
            open: match c.open {
                Some(i) => self.number("open", i)?,
                None => self.number("close", c.close)?,
            },
            high: self.number("high", c.high)?,
            low: self.number("low", c.low)?,
            close: self.number("close", c.close)?,
            volume: match c.volume {
                Some(i) => self.number("volume", i)?,
                None => 0.0,
            },
        })
    }

    fn features(&self, c: &FeatureColumns) -> Result<Features, LoadError> {
        let [ema_9, ema_21, ema_50, ema_100, rsi, macd_hist, atr, atr_pct] = c.0;
        Ok(Features {
            ema_9: self.optional_number("ema_9", ema_9)?,
            ema_21: self.optional_number("ema_21", ema_21)?,
            ema_50: self.optional_number("ema_50", ema_50)?,
            ema_100: self.optional_number("ema_100", ema_100)?,
            rsi: self.optional_number("rsi", rsi)?,
            macd_hist: self.optional_number("macd_hist", macd_hist)?,
            atr: self.optional_number("atr", atr)?,
            atr_pct: self.optional_number("atr_pct", atr_pct)?,
        })
    }

    fn label(&self, idx: usize) -> Result<Label, LoadError> {
        if let Ok(label) = self.cell(idx).parse::<Label>() {
            return Ok(label);
        }
        Label::from_code(self.code("label", idx)?).map_err(|_| self.invalid("label", idx))
    }

    fn regime(&self, idx: Option<usize>) -> Result<Option<Regime>, LoadError> {
        let Some(idx) = idx else {
            return Ok(None);
        };
        if self.cell(idx).is_empty() {
            return Ok(None);
        }
        Regime::from_code(self.code("regime", idx)?)
            .map(Some)
            .map_err(|_| self.invalid("regime", idx))
    }
}

/// Unix ms from an integer, RFC 3339, `YYYY-MM-DD HH:MM:SS[+zz:zz]` or a date.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> LoadError + '_ {
    move |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn read_records(path: &Path) -> Result<(Columns, Vec<csv::StringRecord>), LoadError> {
    let mut reader = open_reader(path)?;
    let cols = Columns::new(reader.headers().map_err(csv_error(path))?);
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error(path))?;
    Ok((cols, records))
}

/// Parse every record with `parse`, then check timestamp order.
fn parse_rows<T>(
    path: &Path,
    records: &[csv::StringRecord],
    parse: impl Fn(&RowReader<'_>) -> Result<T, LoadError>,
    timestamp_of: impl Fn(&T) -> i64,
) -> Result<Vec<T>, LoadError> {
    let rows = records
        .iter()
        .enumerate()
        .map(|(row, record)| parse(&RowReader { path, row, record }))
        .collect::<Result<Vec<T>, _>>()?;

    if let Some(row) = rows
        .windows(2)
        .position(|w| timestamp_of(&w[1]) <= timestamp_of(&w[0]))
    {
        return Err(LoadError::UnorderedTimestamps {
            row: row + 1,
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}

/// Load OHLCV bars. `Open`, `High`, `Low`, `Close`, `Volume` are required.
pub fn load_raw_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let (cols, records) = read_records(path)?;
    let bc = BarColumns::resolve(&cols, path, true)?;
    parse_rows(path, &records, |r| r.bar(&bc), |b| b.timestamp)
}

/// Load feature rows. Indicator columns are optional per column; `regime`
/// is read when present.
pub fn load_feature_rows(path: &Path) -> Result<Vec<(FeatureBar, Option<Regime>)>, LoadError> {
    let (cols, records) = read_records(path)?;
    let bc = BarColumns::resolve(&cols, path, false)?;
    let fc = FeatureColumns::resolve(&cols);
    let regime = cols.optional("regime");
    parse_rows(
        path,
        &records,
        |r| {
            let row = FeatureBar {
                bar: r.bar(&bc)?,
                features: r.features(&fc)?,
            };
            Ok((row, r.regime(regime)?))
        },
        |(row, _)| row.bar.timestamp,
    )
}

/// Load backtest input. `Close`, `Low`, `High`, `atr` and `label` are required.
pub fn load_labeled_bars(path: &Path) -> Result<Vec<LabeledBar>, LoadError> {
    let (cols, records) = read_records(path)?;
    let bc = BarColumns::resolve(&cols, path, false)?;
    let atr = cols.require("atr", path)?;
    let label = cols.require("label", path)?;
    let regime = cols.optional("regime");
    parse_rows(
        path,
        &records,
        |r| {
            Ok(LabeledBar {
                bar: r.bar(&bc)?,
                atr: r.optional_number("atr", Some(atr))?,
                label: r.label(label)?,
                regime: r.regime(regime)?,
            })
        },
        |b| b.bar.timestamp,
    )
}

/// Deterministic BLAKE3 hash over a symbol's labeled bars.
///
/// Covers timestamps, OHLCV, ATR and label codes in file order.
pub fn dataset_hash(symbol: &str, bars: &[LabeledBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for b in bars {
        hasher.update(&b.bar.timestamp.to_le_bytes());
        hasher.update(&b.bar.open.to_le_bytes());
        hasher.update(&b.bar.high.to_le_bytes());
        hasher.update(&b.bar.low.to_le_bytes());
        hasher.update(&b.bar.close.to_le_bytes());
        hasher.update(&b.bar.volume.to_le_bytes());
        hasher.update(&b.atr.unwrap_or(f64::NAN).to_le_bytes());
        hasher.update(&[b.label.code()]);
    }
    hasher.finalize().to_hex().to_string()
}
