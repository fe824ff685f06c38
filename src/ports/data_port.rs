//! Candle storage port trait.

use crate::domain::candle::Candle;
use crate::domain::error::NjordError;
use crate::domain::interval::{Interval, TimeRange};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};

pub trait CandleStore: Send + Sync {
    /// Candles for `symbols` inside `range`, ordered by symbol then time.
    fn fetch_candles(
        &self,
        symbols: &BTreeSet<String>,
        range: &TimeRange,
        interval: Interval,
    ) -> Result<Vec<Candle>, NjordError>;

    /// Store candles, ignoring rows already present. Returns the number of
    /// rows actually written.
    fn insert_candles(&self, candles: &[Candle], interval: Interval) -> Result<usize, NjordError>;

    /// Most recent close per symbol.
    fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
        interval: Interval,
    ) -> Result<BTreeMap<String, (NaiveDateTime, f64)>, NjordError>;

    fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, NjordError>;

    /// First time, last time and row count, or `None` without data.
    fn data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, NjordError>;

    fn delete_candles(&self, symbol: &str, interval: Interval) -> Result<usize, NjordError>;
}
