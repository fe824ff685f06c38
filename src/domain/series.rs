//! Time-indexed numeric series and multi-column frames.
//!
//! Missing or not-yet-defined values (indicator warmup) are NaN.

use crate::domain::candle::Candle;
use crate::domain::interval::TimeRange;
use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub index: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(index: Vec<NaiveDateTime>, values: Vec<f64>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Self { index, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last value that is not NaN.
    pub fn last_valid(&self) -> Option<(NaiveDateTime, f64)> {
        self.index
            .iter()
            .zip(&self.values)
            .rev()
            .find(|(_, v)| !v.is_nan())
            .map(|(t, v)| (*t, *v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl Frame {
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.push_column(name, values);
        self
    }

    /// Append a column, replacing any existing column of the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(self.index.len(), values.len());
        let name = name.into();
        if let Some(slot) = self.columns.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = values;
        } else {
            self.columns.push((name, values));
        }
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn series(&self, name: &str) -> Option<Series> {
        self.column(name)
            .map(|values| Series::new(self.index.clone(), values.to_vec()))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// OHLCV frame for candles of one symbol, in the order given.
    pub fn from_candles(candles: &[Candle]) -> Self {
        let index = candles.iter().map(|c| c.time).collect();
        Frame::new(index)
            .with_column("open", candles.iter().map(|c| c.open).collect())
            .with_column("high", candles.iter().map(|c| c.high).collect())
            .with_column("low", candles.iter().map(|c| c.low).collect())
            .with_column("close", candles.iter().map(|c| c.close).collect())
            .with_column("volume", candles.iter().map(|c| c.volume).collect())
    }

    /// Rows whose timestamp falls inside `range`.
    pub fn filter_range(&self, range: &TimeRange) -> Self {
        let keep: Vec<usize> = (0..self.index.len())
            .filter(|&i| range.contains(self.index[i]))
            .collect();
        Frame {
            index: keep.iter().map(|&i| self.index[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(n, v)| (n.clone(), keep.iter().map(|&i| v[i]).collect()))
                .collect(),
        }
    }
}

/// Reindex `values` (keyed by `from`) onto `target`, filling gaps with NaN.
pub fn align(from: &[NaiveDateTime], values: &[f64], target: &[NaiveDateTime]) -> Vec<f64> {
    if from == target {
        return values.to_vec();
    }
    let lookup: HashMap<NaiveDateTime, f64> =
        from.iter().copied().zip(values.iter().copied()).collect();
    target
        .iter()
        .map(|t| lookup.get(t).copied().unwrap_or(f64::NAN))
        .collect()
}

/// Sorted union of several indexes.
pub fn union_index<'a>(indexes: impl IntoIterator<Item = &'a [NaiveDateTime]>) -> Vec<NaiveDateTime> {
    let mut merged: Vec<NaiveDateTime> = indexes.into_iter().flatten().copied().collect();
    merged.sort();
    merged.dedup();
    merged
}
