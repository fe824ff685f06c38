#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use njord::domain::candle::Candle;
use njord::domain::error::NjordError;
use njord::domain::interval::{Interval, TimeRange, midnight};
use njord::ports::data_port::CandleStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub struct MockCandleStore {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockCandleStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), NjordError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(NjordError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl CandleStore for MockCandleStore {
    fn fetch_candles(
        &self,
        symbols: &BTreeSet<String>,
        range: &TimeRange,
        _interval: Interval,
    ) -> Result<Vec<Candle>, NjordError> {
        let mut out = Vec::new();
        for symbol in symbols {
            self.check(symbol)?;
            if let Some(candles) = self.data.get(symbol) {
                out.extend(candles.iter().filter(|c| range.contains(c.time)).cloned());
            }
        }
        Ok(out)
    }

    fn insert_candles(&self, _candles: &[Candle], _interval: Interval) -> Result<usize, NjordError> {
        Err(NjordError::Database {
            reason: "mock store is read-only".into(),
        })
    }

    fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
        _interval: Interval,
    ) -> Result<BTreeMap<String, (NaiveDateTime, f64)>, NjordError> {
        Ok(symbols
            .iter()
            .filter_map(|s| {
                let last = self.data.get(s)?.last()?;
                Some((s.clone(), (last.time, last.close)))
            })
            .collect())
    }

    fn list_symbols(&self, _interval: Interval) -> Result<Vec<String>, NjordError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
        _interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, NjordError> {
        self.check(symbol)?;
        Ok(self
            .data
            .get(symbol)
            .and_then(|c| Some((c.first()?.time, c.last()?.time, c.len()))))
    }

    fn delete_candles(&self, _symbol: &str, _interval: Interval) -> Result<usize, NjordError> {
        Ok(0)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_candle(symbol: &str, date: &str, close: f64) -> Candle {
    Candle {
        symbol: symbol.to_string(),
        time: midnight(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// Daily candles on a wavy upward path, so indicators see both directions.
pub fn generate_candles(symbol: &str, start_date: &str, count: usize, start_price: f64) -> Vec<Candle> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = start_price + 0.2 * x + 5.0 * (x / 7.0).sin();
            Candle {
                symbol: symbol.to_string(),
                time: midnight(start + chrono::Duration::days(i as i64)),
                open: close - 0.5 * (x / 3.0).cos(),
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1000.0 + 100.0 * (x / 5.0).sin().abs(),
            }
        })
        .collect()
}

pub fn full_range() -> TimeRange {
    TimeRange::from_dates(date(2000, 1, 1), date(2100, 1, 1))
}
