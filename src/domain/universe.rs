//! Symbol universes for multi-symbol runs.
//!
//! Parses symbol lists from configuration or the command line and checks that
//! each symbol has enough stored candles to be worth running.

use crate::domain::error::NjordError;
use crate::domain::interval::{Interval, TimeRange};
use crate::ports::data_port::CandleStore;
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

pub const MIN_CANDLES: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub symbols: Vec<String>,
    pub interval: Interval,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_set(&self) -> BTreeSet<String> {
        self.symbols.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

impl From<UniverseError> for NjordError {
    fn from(e: UniverseError) -> Self {
        NjordError::ConfigInvalid {
            section: "symbols".into(),
            key: "symbols".into(),
            reason: e.to_string(),
        }
    }
}

/// Split a comma-separated symbol list, uppercasing each entry.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientCandles { candles: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedSymbol>,
}

/// Keep the symbols with at least `min_candles` candles inside `range`.
/// Fails only when no symbol survives.
pub fn validate_universe(
    store: &dyn CandleStore,
    symbols: Vec<String>,
    range: &TimeRange,
    interval: Interval,
    min_candles: usize,
) -> Result<UniverseValidationResult, NjordError> {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();
    let total = symbols.len();

    for symbol in symbols {
        let count = match store.fetch_candles(&BTreeSet::from([symbol.clone()]), range, interval) {
            Ok(candles) => candles.len(),
            Err(e) => {
                warn!(%symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if count == 0 {
            warn!(%symbol, "skipping symbol without data");
            skipped.push(SkippedSymbol {
                symbol,
                reason: SkipReason::NoData,
            });
            continue;
        }
        if count < min_candles {
            warn!(%symbol, candles = count, minimum = min_candles, "skipping symbol with too few candles");
            skipped.push(SkippedSymbol {
                symbol,
                reason: SkipReason::InsufficientCandles { candles: count },
            });
            continue;
        }

        info!(%symbol, candles = count, "symbol ok");
        valid.push(symbol);
    }

    if valid.is_empty() {
        return Err(NjordError::InsufficientData {
            symbol: "all".to_string(),
            rows: 0,
            minimum: min_candles,
        });
    }
    if !skipped.is_empty() {
        info!(running = valid.len(), total, %interval, "reduced universe");
    }

    Ok(UniverseValidationResult {
        universe: Universe {
            symbols: valid,
            interval,
        },
        skipped,
    })
}
