//! Per-column standardization to zero mean and unit variance.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::identity(0)
    }
}

impl StandardScaler {
    /// Leaves `width` columns unchanged.
    pub fn identity(width: usize) -> Self {
        Self {
            mean: Array1::zeros(width),
            scale: Array1::ones(width),
        }
    }

    /// Fit on a rows-by-features matrix. Population standard deviation; a
    /// column with zero spread scales by 1.
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let Some(mean) = x.mean_axis(Axis(0)) else {
            return Self::identity(x.ncols());
        };
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });
        Self { mean, scale }
    }

    /// Fit a single-column scaler, as used for regression targets.
    pub fn fit_column(values: ArrayView1<'_, f64>) -> Self {
        Self::fit(values.insert_axis(Axis(1)))
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }

    pub fn fit_transform(x: ArrayView2<'_, f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(x);
        let scaled = scaler.transform(x);
        (scaler, scaled)
    }

    /// Scale one value of the first column.
    pub fn transform_value(&self, value: f64) -> f64 {
        match (self.mean.first(), self.scale.first()) {
            (Some(m), Some(s)) => (value - m) / s,
            _ => value,
        }
    }

    /// Undo [`transform_value`](Self::transform_value).
    pub fn inverse_transform_value(&self, value: f64) -> f64 {
        match (self.mean.first(), self.scale.first()) {
            (Some(m), Some(s)) => value * s + m,
            _ => value,
        }
    }
}
