//! Read-only candle store over CSV files.
//!
//! Each file holds one symbol at one interval and is named
//! `{SYMBOL}_{interval}.csv`, e.g. `AAPL_1day.csv`. Columns are
//! `date,open,high,low,close,volume`; the date may carry a time.

use crate::domain::candle::{Candle, sort_and_dedup};
use crate::domain::error::NjordError;
use crate::domain::interval::{Interval, TimeRange, parse_datetime};
use crate::ports::data_port::CandleStore;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn csv_error(reason: impl Into<String>) -> NjordError {
    NjordError::Database {
        reason: reason.into(),
    }
}

fn number(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, NjordError> {
    record
        .get(index)
        .ok_or_else(|| csv_error(format!("missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| csv_error(format!("invalid {name} value: {e}")))
}

/// Parse one CSV file of candles for `symbol`, sorted by time.
pub fn read_csv_file(path: &Path, symbol: &str) -> Result<Vec<Candle>, NjordError> {
    let content = fs::read_to_string(path)
        .map_err(|e| csv_error(format!("failed to read {}: {}", path.display(), e)))?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(format!("CSV parse error: {e}")))?;
        let date = record
            .get(0)
            .ok_or_else(|| csv_error("missing date column"))?;
        let time = parse_datetime(date).map_err(|e| csv_error(format!("invalid date format: {}", e.message)))?;

        candles.push(Candle {
            symbol: symbol.to_string(),
            time,
            open: number(&record, 1, "open")?,
            high: number(&record, 2, "high")?,
            low: number(&record, 3, "low")?,
            close: number(&record, 4, "close")?,
            volume: number(&record, 5, "volume")?,
        });
    }

    sort_and_dedup(&mut candles);
    Ok(candles)
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }

    fn read_symbol(&self, symbol: &str, interval: Interval) -> Result<Option<Vec<Candle>>, NjordError> {
        let path = self.csv_path(symbol, interval);
        if !path.exists() {
            debug!(path = %path.display(), "no csv file");
            return Ok(None);
        }
        read_csv_file(&path, symbol).map(Some)
    }
}

impl CandleStore for CsvAdapter {
    fn fetch_candles(
        &self,
        symbols: &BTreeSet<String>,
        range: &TimeRange,
        interval: Interval,
    ) -> Result<Vec<Candle>, NjordError> {
        let mut out = Vec::new();
        for symbol in symbols {
            if let Some(candles) = self.read_symbol(symbol, interval)? {
                out.extend(candles.into_iter().filter(|c| range.contains(c.time)));
            }
        }
        Ok(out)
    }

    fn insert_candles(&self, _candles: &[Candle], _interval: Interval) -> Result<usize, NjordError> {
        Err(csv_error("csv store is read-only"))
    }

    fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
        interval: Interval,
    ) -> Result<BTreeMap<String, (NaiveDateTime, f64)>, NjordError> {
        let mut out = BTreeMap::new();
        for symbol in symbols {
            if let Some(last) = self.read_symbol(symbol, interval)?.and_then(|c| c.last().cloned()) {
                out.insert(symbol.clone(), (last.time, last.close));
            }
        }
        Ok(out)
    }

    fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, NjordError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            csv_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| csv_error(format!("directory entry error: {e}")))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, NjordError> {
        Ok(self
            .read_symbol(symbol, interval)?
            .and_then(|c| Some((c.first()?.time, c.last()?.time, c.len()))))
    }

    fn delete_candles(&self, _symbol: &str, _interval: Interval) -> Result<usize, NjordError> {
        Err(csv_error("csv store is read-only"))
    }
}
