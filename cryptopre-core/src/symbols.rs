//! Trading-pair lookup table with typo correction.
//!
//! The table is an explicit value: load it once, pass it where needed, and
//! call [`SymbolTable::reload`] to refresh it.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Minimum similarity for a fuzzy suggestion.
pub const FUZZY_CUTOFF: f64 = 0.6;

/// Longest input treated as a bare coin name (`BTC` → `BTCUSDT`).
const SHORT_COIN_MAX_LEN: usize = 5;

const QUOTE: &str = "USDT";

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to read symbol list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of [`SymbolTable::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Input is a listed symbol.
    Exact(String),
    /// Input was rewritten to a listed symbol.
    Corrected { symbol: String, note: String },
    /// Nothing close enough.
    Invalid { note: String },
}

impl Resolution {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Resolution::Exact(s) | Resolution::Corrected { symbol: s, .. } => Some(s),
            Resolution::Invalid { .. } => None,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Resolution::Exact(_) => None,
            Resolution::Corrected { note, .. } | Resolution::Invalid { note } => Some(note),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeSet<String>,
}

impl SymbolTable {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        table.reload(symbols);
        table
    }

    /// Read one symbol per line. Blank lines and `#` comments are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SymbolError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SymbolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        ))
    }

    /// Replace the table contents.
    pub fn reload<I, S>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.symbols = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    /// Resolve user input to a listed symbol.
    ///
    /// Order: exact match, `…USD` rewritten to `…USDT`, short coin name plus
    /// `USDT`, closest fuzzy match at or above [`FUZZY_CUTOFF`].
    pub fn normalize(&self, input: &str) -> Resolution {
        let symbol = input.trim().to_uppercase();

        if self.contains(&symbol) {
            return Resolution::Exact(symbol);
        }

        if symbol.ends_with("USD") {
            let guess = symbol.replace("USD", QUOTE);
            if self.contains(&guess) {
                return Resolution::Corrected {
                    note: format!("{symbol} not found. Using {guess}."),
                    symbol: guess,
                };
            }
        }

        if symbol.chars().count() <= SHORT_COIN_MAX_LEN {
            let guess = format!("{symbol}{QUOTE}");
            if self.contains(&guess) {
                return Resolution::Corrected {
                    note: format!("{symbol} is incomplete. Using {guess}."),
                    symbol: guess,
                };
            }
        }

        if let Some(guess) = self.closest(&symbol) {
            return Resolution::Corrected {
                note: format!("{symbol} not found. Did you mean {guess}?"),
                symbol: guess.to_string(),
            };
        }

        Resolution::Invalid {
            note: format!("Symbol {symbol} is not listed on the exchange."),
        }
    }

    /// Best candidate with ratio ≥ [`FUZZY_CUTOFF`]; ties go to the
    /// lexically greater symbol.
    fn closest(&self, query: &str) -> Option<&str> {
        let q: Vec<char> = query.chars().collect();
        let mut best: Option<(f64, &str)> = None;
        for candidate in self.iter() {
            let c: Vec<char> = candidate.chars().collect();
            let score = similarity(&c, &q);
            if score < FUZZY_CUTOFF {
                continue;
            }
            match best {
                Some((s, name)) if s > score || (s == score && name > candidate) => {}
                _ => best = Some((score, candidate)),
            }
        }
        best.map(|(_, s)| s)
    }
}

/// Ratcliff/Obershelp similarity: `2·M / (|a| + |b|)` where `M` is the total
/// size of the recursively found longest common blocks.
fn similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(a, b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a`
/// on ties. Returns `(i, j, len)`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run length of the match ending at b[j], for the previous row of a
    let mut prev: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let run = j.checked_sub(1).and_then(|pj| prev.get(&pj)).copied();
                let k = run.unwrap_or(0) + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        prev = next;
    }
    (best_i, best_j, best_k)
}
