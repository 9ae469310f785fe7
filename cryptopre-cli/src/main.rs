//! CryptoPre CLI: data preparation, backtesting and live signal commands.
//!
//! Commands:
//! - `features`: raw OHLCV files → indicator feature files
//! - `regime`: tag feature files with the market regime
//! - `label`: feature files → labeled files
//! - `backtest`: backtest every labeled file and write summary/log/equity CSVs
//! - `pipeline`: regime → label → backtest (optionally starting with features)
//! - `signal`: assemble the live signal for a classifier prediction
//! - `symbol`: resolve a symbol against a symbol list
//! - `synth`: write a seeded synthetic raw file

mod obs;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use cryptopre_core::domain::Label;
use cryptopre_core::levels::FixedFractionBracket;
use cryptopre_core::signal::{LiveSignal, Prediction};
use cryptopre_core::symbols::{Resolution, SymbolTable};
use cryptopre_runner::batch::{run_batch, BatchReport, SymbolStatus};
use cryptopre_runner::config::PipelineConfig;
use cryptopre_runner::data_loader::load_feature_rows;
use cryptopre_runner::export::{render_bars_csv, write_file};
use cryptopre_runner::prepare::{
    add_regimes, build_features, label_features, StageSummary, FEATURE_PREFIX, RAW_PREFIX,
};
use cryptopre_runner::stages::standard_pipeline;
use cryptopre_runner::synthetic::{generate_bars, SyntheticConfig};

use crate::obs::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(
    name = "cryptopre",
    about = "CryptoPre CLI: crypto signal labeling and backtesting",
    version
)]
struct Cli {
    /// Path to a TOML pipeline config. Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. info, debug, cryptopre_core=trace). CRYPTOPRE_LOG wins if set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Directory overrides shared by the file commands.
#[derive(Args, Debug, Default)]
struct PathArgs {
    /// Directory holding raw_<symbol>.csv files.
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Directory holding feat_/labeled_<symbol>.csv files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for backtest artifacts.
    #[arg(long)]
    results_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct BacktestArgs {
    /// Starting account balance.
    #[arg(long)]
    initial_balance: Option<f64>,

    /// First bar index eligible for a decision.
    #[arg(long)]
    start_index: Option<usize>,

    /// Run symbols one after another instead of in parallel.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute indicator features for every raw_<symbol>.csv.
    Features {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Add the regime column to every feat_<symbol>.csv.
    Regime {
        #[command(flatten)]
        paths: PathArgs,

        /// ATR/close ratio above which a trendless bar is HIGH_VOL_CHOP.
        #[arg(long)]
        high_vol_atr_pct: Option<f64>,
    },
    /// Write labeled_<symbol>.csv for every feat_<symbol>.csv.
    Label {
        #[command(flatten)]
        paths: PathArgs,

        /// Bars ahead used for the forward return.
        #[arg(long)]
        future_step: Option<usize>,

        /// Return magnitude required for BUY/SELL.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Backtest every labeled_<symbol>.csv.
    Backtest {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        backtest: BacktestArgs,

        /// Print the batch report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run regime → label → backtest.
    Pipeline {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        backtest: BacktestArgs,

        /// Start with the feature stage over raw files.
        #[arg(long, default_value_t = false)]
        with_features: bool,
    },
    /// Assemble the live signal for a classifier prediction.
    Signal {
        /// Trading pair, e.g. BTCUSDT.
        #[arg(long)]
        symbol: String,

        /// Predicted class: BUY, HOLD, SELL (or 2/1/0).
        #[arg(long)]
        label: Label,

        /// Probability of the predicted class, in [0, 1].
        #[arg(long)]
        confidence: f64,

        /// Feature file; defaults to <data_dir>/feat_<symbol>.csv.
        #[arg(long)]
        features: Option<PathBuf>,

        /// Symbol list (one per line) used to correct the symbol.
        #[arg(long)]
        symbols: Option<PathBuf>,

        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Print the signal as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve a symbol against a symbol list.
    Symbol {
        input: String,

        /// Symbol list (one per line).
        #[arg(long)]
        symbols: PathBuf,
    },
    /// Write a seeded synthetic raw_<symbol>.csv.
    Synth {
        /// Symbols to generate.
        #[arg(required = true)]
        symbols: Vec<String>,

        #[arg(long, default_value_t = 1000)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        #[arg(long)]
        raw_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Features { paths } => {
            apply_paths(&mut config, &paths);
            print_stage(&build_features(&config)?);
            Ok(())
        }
        Commands::Regime {
            paths,
            high_vol_atr_pct,
        } => {
            apply_paths(&mut config, &paths);
            if let Some(v) = high_vol_atr_pct {
                config.regime.high_vol_atr_pct = v;
            }
            config.validate()?;
            print_stage(&add_regimes(&config)?);
            Ok(())
        }
        Commands::Label {
            paths,
            future_step,
            threshold,
        } => {
            apply_paths(&mut config, &paths);
            if let Some(v) = future_step {
                config.labeling.future_step = v;
            }
            if let Some(v) = threshold {
                config.labeling.threshold = v;
            }
            config.validate()?;
            print_stage(&label_features(&config)?);
            Ok(())
        }
        Commands::Backtest {
            paths,
            backtest,
            json,
        } => {
            apply_paths(&mut config, &paths);
            apply_backtest(&mut config, &backtest)?;
            run_backtest_cmd(&config, json)
        }
        Commands::Pipeline {
            paths,
            backtest,
            with_features,
        } => {
            apply_paths(&mut config, &paths);
            apply_backtest(&mut config, &backtest)?;
            for report in standard_pipeline(&config, with_features).run()? {
                println!("[DONE] {}: {}", report.name, report.detail);
            }
            Ok(())
        }
        Commands::Signal {
            symbol,
            label,
            confidence,
            features,
            symbols,
            data_dir,
            json,
        } => {
            if let Some(dir) = data_dir {
                config.paths.data_dir = dir;
            }
            run_signal_cmd(&config, &symbol, label, confidence, features, symbols, json)
        }
        Commands::Symbol { input, symbols } => {
            let table = SymbolTable::from_file(&symbols)?;
            let resolution = table.normalize(&input);
            if let Some(note) = resolution.note() {
                println!("{note}");
            }
            match resolution.symbol() {
                Some(s) => {
                    println!("{s}");
                    Ok(())
                }
                None => bail!("no matching symbol for '{input}'"),
            }
        }
        Commands::Synth {
            symbols,
            bars,
            seed,
            start_price,
            raw_dir,
        } => {
            if let Some(dir) = raw_dir {
                config.paths.raw_dir = dir;
            }
            let synth = SyntheticConfig {
                bars,
                seed,
                start_price,
                ..SyntheticConfig::default()
            };
            run_synth_cmd(&config.paths.raw_dir, &symbols, &synth)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn apply_paths(config: &mut PipelineConfig, paths: &PathArgs) {
    if let Some(dir) = &paths.raw_dir {
        config.paths.raw_dir = dir.clone();
    }
    if let Some(dir) = &paths.data_dir {
        config.paths.data_dir = dir.clone();
    }
    if let Some(dir) = &paths.results_dir {
        config.paths.results_dir = dir.clone();
    }
}

fn apply_backtest(config: &mut PipelineConfig, args: &BacktestArgs) -> Result<()> {
    if let Some(v) = args.initial_balance {
        config.backtest.engine.initial_balance = v;
    }
    if let Some(v) = args.start_index {
        config.backtest.engine.start_index = v;
    }
    if args.sequential {
        config.backtest.parallel = false;
    }
    config.validate()?;
    Ok(())
}

fn print_stage(summary: &StageSummary) {
    for file in &summary.files {
        match &file.result {
            Ok(rows) => println!("[DONE] {} {}: {rows} rows", summary.stage, file.symbol),
            Err(reason) => println!("[SKIP] {} {}: {reason}", summary.stage, file.symbol),
        }
    }
    println!(
        "{}: {} processed, {} skipped",
        summary.stage,
        summary.processed(),
        summary.skipped()
    );
}

fn run_backtest_cmd(config: &PipelineConfig, json: bool) -> Result<()> {
    let report = run_batch(config)?;
    if json {
        println!("{}", report.to_json()?);
    } else {
        print_batch(&report);
    }
    Ok(())
}

fn print_batch(report: &BatchReport) {
    for r in &report.reports {
        match (&r.status, &r.summary) {
            (SymbolStatus::Completed, Some(s)) => println!(
                "[DONE] {}: trades={} wins={} losses={} accuracy={:.2}% pf={:.2} \
                 max_dd={:.2}% final={:.2} return={:.2}%",
                r.symbol,
                s.total_trades,
                s.wins,
                s.losses,
                s.accuracy_pct,
                s.profit_factor,
                s.max_drawdown_pct,
                s.final_balance,
                s.return_pct
            ),
            (SymbolStatus::Failed(msg), _) => println!("[FAIL] {}: {msg}", r.symbol),
            (SymbolStatus::Completed, None) => println!("[DONE] {}", r.symbol),
        }
    }
    println!(
        "{} completed, {} failed",
        report.completed(),
        report.failed()
    );
}

fn run_signal_cmd(
    config: &PipelineConfig,
    symbol: &str,
    label: Label,
    confidence: f64,
    features: Option<PathBuf>,
    symbols: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let symbol = match symbols {
        Some(list) => {
            let table = SymbolTable::from_file(&list)?;
            match table.normalize(symbol) {
                Resolution::Exact(s) => s,
                Resolution::Corrected { symbol, note } => {
                    println!("{note}");
                    symbol
                }
                Resolution::Invalid { note } => bail!(note),
            }
        }
        None => symbol.to_uppercase(),
    };

    let path = features
        .unwrap_or_else(|| config.paths.data_dir.join(format!("{FEATURE_PREFIX}{symbol}.csv")));
    let rows: Vec<_> = load_feature_rows(&path)
        .with_context(|| format!("failed to load features for {symbol}"))?
        .into_iter()
        .map(|(row, _)| row)
        .collect();

    let signal = LiveSignal::assemble(
        &symbol,
        Prediction { label, confidence },
        &rows,
        &FixedFractionBracket::default(),
    )?;
    info!(symbol = %signal.symbol, label = %signal.label, "signal assembled");

    if json {
        println!("{}", serde_json::to_string_pretty(&signal)?);
        return Ok(());
    }

    println!("Symbol:      {}", signal.symbol);
    println!("Signal:      {}", signal.label);
    println!("Confidence:  {:.2}%", signal.confidence_pct);
    println!("Price:       {:.4}", signal.price);
    if let Some(lv) = &signal.levels {
        println!("Direction:   {}", lv.direction);
        println!("Stop loss:   {:.4}", lv.stop_loss);
        println!("Take profit: {:.4}", lv.take_profit);
        println!("Risk/reward: {:.1}", lv.risk_reward);
    }
    println!("Trend:       {}", signal.description);
    Ok(())
}

fn run_synth_cmd(raw_dir: &Path, symbols: &[String], synth: &SyntheticConfig) -> Result<()> {
    for symbol in symbols {
        let bars = generate_bars(symbol, synth);
        let path = raw_dir.join(format!("{RAW_PREFIX}{symbol}.csv"));
        write_file(&path, &render_bars_csv(&bars)?)?;
        println!("Wrote {} bars to {}", bars.len(), path.display());
    }
    Ok(())
}
