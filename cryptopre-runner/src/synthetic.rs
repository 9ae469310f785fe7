//! Seeded random-walk OHLCV bars for demos and tests.
//!
//! Crypto trades around the clock, so bars are contiguous at the chosen
//! interval. The same `(symbol, seed)` always produces the same series.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use cryptopre_core::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub bars: usize,
    pub start_price: f64,
    /// Max absolute per-bar close-to-close return.
    pub max_step: f64,
    /// Max wick beyond the body, as a fraction of price.
    pub max_wick: f64,
    pub interval_ms: i64,
    pub start_ms: i64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 1_000,
            start_price: 100.0,
            max_step: 0.01,
            max_wick: 0.005,
            interval_ms: 3_600_000,
            // 2024-01-01T00:00:00Z
            start_ms: 1_704_067_200_000,
            seed: 42,
        }
    }
}

/// Seed mixed from the symbol name and the configured seed.
fn rng_for(symbol: &str, seed: u64) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&seed.to_le_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

pub fn generate_bars(symbol: &str, cfg: &SyntheticConfig) -> Vec<Bar> {
    let mut rng = rng_for(symbol, cfg.seed);
    let mut price = cfg.start_price;

    (0..cfg.bars)
        .map(|i| {
            let step: f64 = if cfg.max_step > 0.0 {
                rng.gen_range(-cfg.max_step..cfg.max_step)
            } else {
                0.0
            };
            let open = price;
            let close = (price * (1.0 + step)).max(f64::MIN_POSITIVE);
            let (up, down): (f64, f64) = if cfg.max_wick > 0.0 {
                (rng.gen_range(0.0..cfg.max_wick), rng.gen_range(0.0..cfg.max_wick))
            } else {
                (0.0, 0.0)
            };
            price = close;
            Bar {
                timestamp: cfg.start_ms + i as i64 * cfg.interval_ms,
                open,
                high: open.max(close) * (1.0 + up),
                low: open.min(close) * (1.0 - down),
                close,
                volume: rng.gen_range(100.0..10_000.0),
            }
        })
        .collect()
}
