//! Named signal values produced by the evaluator.

use crate::domain::error::NjordError;
use crate::domain::series::{Frame, Series};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    Series(Series),
    Frame(Frame),
}

impl SignalValue {
    pub fn index(&self) -> &[NaiveDateTime] {
        match self {
            SignalValue::Series(s) => &s.index,
            SignalValue::Frame(f) => &f.index,
        }
    }

    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub value: SignalValue,
}

impl Signal {
    pub fn new(name: impl Into<String>, value: SignalValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Pick one column out of a frame signal. The result is named
    /// `name[field]`.
    pub fn select(&self, field: &str) -> Result<Signal, NjordError> {
        match &self.value {
            SignalValue::Frame(frame) => {
                let series = frame.series(field).ok_or_else(|| NjordError::InvalidSelect {
                    signal: self.name.clone(),
                    field: field.to_string(),
                    reason: format!(
                        "available fields: {}",
                        frame.column_names().collect::<Vec<_>>().join(", ")
                    ),
                })?;
                Ok(Signal::new(
                    format!("{}[{}]", self.name, field),
                    SignalValue::Series(series),
                ))
            }
            SignalValue::Series(_) => Err(NjordError::InvalidSelect {
                signal: self.name.clone(),
                field: field.to_string(),
                reason: "signal is a single series".into(),
            }),
        }
    }

    /// The signal as a single series, for indicators that take one input.
    pub fn as_series(&self) -> Result<&Series, NjordError> {
        match &self.value {
            SignalValue::Series(s) => Ok(s),
            SignalValue::Frame(_) => Err(NjordError::InvalidSelect {
                signal: self.name.clone(),
                field: String::new(),
                reason: "expected a single series, select a field first".into(),
            }),
        }
    }

    /// The signal as a frame, for indicators that read high/low/close.
    pub fn as_frame(&self) -> Result<&Frame, NjordError> {
        match &self.value {
            SignalValue::Frame(f) => Ok(f),
            SignalValue::Series(_) => Err(NjordError::InvalidSelect {
                signal: self.name.clone(),
                field: String::new(),
                reason: "expected a multi-column frame".into(),
            }),
        }
    }

    /// Flatten into named columns: a series is one column named after the
    /// signal, a frame yields `name[field]` per column.
    pub fn columns(&self) -> Vec<(String, &[f64])> {
        match &self.value {
            SignalValue::Series(s) => vec![(self.name.clone(), s.values.as_slice())],
            SignalValue::Frame(f) => f
                .columns
                .iter()
                .map(|(field, values)| (format!("{}[{}]", self.name, field), values.as_slice()))
                .collect(),
        }
    }
}
