//! Time-aligned table of signals for one symbol, split into features and
//! labels for model training.

use crate::domain::error::NjordError;
use crate::domain::scaler::StandardScaler;
use crate::domain::series::{align, union_index};
use crate::domain::signal::Signal;
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    index: Vec<NaiveDateTime>,
    columns: Vec<(String, Vec<f64>)>,
    label_keys: Vec<String>,
}

/// Unscaled feature matrix and target, rows in time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub dates: Vec<NaiveDateTime>,
    pub feature_names: Vec<String>,
    /// One row per date, one column per feature name.
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

/// A dataset after standardization, with the scalers that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledDataset {
    pub data: Dataset,
    pub x_scaler: StandardScaler,
    pub y_scaler: StandardScaler,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Append rows from another dataset with the same features.
    pub fn extend(&mut self, other: Dataset) -> Result<(), NjordError> {
        if self.feature_names.is_empty() && self.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.feature_names != other.feature_names {
            return Err(NjordError::Model {
                reason: "cannot combine datasets with different features".into(),
            });
        }
        self.x.append(Axis(0), other.x.view()).map_err(shape_error)?;
        self.y.append(Axis(0), other.y.view()).map_err(shape_error)?;
        self.dates.extend(other.dates);
        Ok(())
    }

    /// Fit scalers on this data and standardize it.
    pub fn scale(self) -> ScaledDataset {
        let (x_scaler, x) = StandardScaler::fit_transform(self.x.view());
        let y_scaler = StandardScaler::fit_column(self.y.view());
        let y = self.y.mapv(|v| y_scaler.transform_value(v));
        ScaledDataset {
            data: Dataset {
                dates: self.dates,
                feature_names: self.feature_names,
                x,
                y,
            },
            x_scaler,
            y_scaler,
        }
    }
}

fn shape_error(e: ndarray::ShapeError) -> NjordError {
    NjordError::Model {
        reason: format!("bad feature matrix: {e}"),
    }
}

fn forward_fill(values: &[f64]) -> Vec<f64> {
    let mut last = f64::NAN;
    values
        .iter()
        .map(|v| {
            if !v.is_nan() {
                last = *v;
            }
            last
        })
        .collect()
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Non-label column names, sorted.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .columns
            .iter()
            .map(|(n, _)| n.clone())
            .filter(|n| !self.label_keys.contains(n))
            .collect();
        names.sort();
        names
    }

    /// Outer-join a signal's columns onto the set. Columns whose name is
    /// already present are left as they are.
    fn merge(&mut self, signal: &Signal) -> Vec<String> {
        let source_index = signal.value.index();
        let merged = union_index([self.index.as_slice(), source_index]);
        if merged != self.index {
            for (_, values) in &mut self.columns {
                *values = align(&self.index, values, &merged);
            }
            self.index = merged;
        }

        let mut names = Vec::new();
        for (name, values) in signal.columns() {
            if self.column(&name).is_some() {
                debug!(column = %name, "column already present");
            } else {
                let aligned = align(source_index, values, &self.index);
                self.columns.push((name.clone(), aligned));
            }
            names.push(name);
        }
        names
    }

    pub fn add_feature(&mut self, signal: &Signal) {
        self.merge(signal);
    }

    /// Add a signal whose columns are prediction targets. Fails when one of
    /// them is already a feature column, which would otherwise drop that
    /// feature from the model inputs.
    pub fn add_label(&mut self, signal: &Signal) -> Result<(), NjordError> {
        let features = self.feature_names();
        let clash = signal
            .columns()
            .into_iter()
            .map(|(name, _)| name)
            .find(|name| features.contains(name));
        if let Some(name) = clash {
            warn!(column = %name, "label column is also a feature");
            return Err(NjordError::Model {
                reason: format!("label '{name}' is also used as a feature"),
            });
        }
        for name in self.merge(signal) {
            if !self.label_keys.contains(&name) {
                self.label_keys.push(name);
            }
        }
        Ok(())
    }

    fn filled_columns(&self, names: &[String]) -> Result<Vec<Vec<f64>>, NjordError> {
        names
            .iter()
            .map(|name| {
                self.column(name)
                    .map(forward_fill)
                    .ok_or_else(|| NjordError::Model {
                        reason: format!("signal set has no column '{name}'"),
                    })
            })
            .collect()
    }

    /// Forward-fill, drop rows with any missing value, and split features
    /// (sorted by name) from the first label.
    pub fn dataset(&self) -> Result<Dataset, NjordError> {
        let label = self.label_keys.first().ok_or_else(|| NjordError::Model {
            reason: "signal set has no label".into(),
        })?;
        let feature_names = self.feature_names();
        if feature_names.is_empty() {
            return Err(NjordError::NoFeatures);
        }

        let all_names: Vec<String> = self.columns.iter().map(|(n, _)| n.clone()).collect();
        let filled = self.filled_columns(&all_names)?;
        let position = |name: &str| all_names.iter().position(|n| n == name);

        let feature_cols: Vec<usize> = feature_names.iter().filter_map(|n| position(n)).collect();
        let label_col = position(label).ok_or_else(|| NjordError::Model {
            reason: format!("label column '{label}' missing"),
        })?;

        let mut dates = Vec::new();
        let mut flat = Vec::new();
        let mut y = Vec::new();
        for row in 0..self.index.len() {
            if filled.iter().any(|col| col[row].is_nan()) {
                continue;
            }
            dates.push(self.index[row]);
            flat.extend(feature_cols.iter().map(|&c| filled[c][row]));
            y.push(filled[label_col][row]);
        }

        if dates.is_empty() {
            return Err(NjordError::Model {
                reason: "no complete rows after dropping missing values".into(),
            });
        }
        let x = Array2::from_shape_vec((dates.len(), feature_cols.len()), flat).map_err(shape_error)?;
        Ok(Dataset {
            dates,
            feature_names,
            x,
            y: Array1::from(y),
        })
    }

    /// [`dataset`](Self::dataset) with freshly fitted scalers applied.
    pub fn to_xy(&self) -> Result<ScaledDataset, NjordError> {
        Ok(self.dataset()?.scale())
    }

    /// Feature rows for prediction: forward-filled, rows with a missing
    /// feature dropped, scaled with an already fitted scaler. Labels are
    /// ignored.
    pub fn to_x_with(
        &self,
        feature_names: &[String],
        x_scaler: &StandardScaler,
    ) -> Result<(Vec<NaiveDateTime>, Array2<f64>), NjordError> {
        if x_scaler.n_features() != feature_names.len() {
            return Err(NjordError::Model {
                reason: format!(
                    "scaler expects {} features, got {}",
                    x_scaler.n_features(),
                    feature_names.len()
                ),
            });
        }
        let filled = self.filled_columns(feature_names)?;
        let mut dates = Vec::new();
        let mut flat = Vec::new();
        for row in 0..self.index.len() {
            if filled.iter().any(|col| col[row].is_nan()) {
                continue;
            }
            dates.push(self.index[row]);
            flat.extend(filled.iter().map(|col| col[row]));
        }
        let raw = Array2::from_shape_vec((dates.len(), filled.len()), flat).map_err(shape_error)?;
        Ok((dates, x_scaler.transform(raw.view())))
    }

    /// Inner-join several sets on timestamp, union their label keys and
    /// keep time order. `None` for an empty input.
    pub fn concat(sets: Vec<SignalSet>) -> Option<SignalSet> {
        let mut iter = sets.into_iter();
        let mut acc = iter.next()?;
        for set in iter {
            let keep: BTreeSet<NaiveDateTime> = set.index.iter().copied().collect();
            let index: Vec<NaiveDateTime> =
                acc.index.iter().copied().filter(|t| keep.contains(t)).collect();

            let mut merged = SignalSet {
                index: index.clone(),
                columns: Vec::new(),
                label_keys: acc.label_keys.clone(),
            };
            for source in [&acc, &set] {
                for (name, values) in &source.columns {
                    if merged.column(name).is_none() {
                        merged
                            .columns
                            .push((name.clone(), align(&source.index, values, &index)));
                    }
                }
            }
            for key in set.label_keys {
                if !merged.label_keys.contains(&key) {
                    merged.label_keys.push(key);
                }
            }
            acc = merged;
        }
        Some(acc)
    }
}
