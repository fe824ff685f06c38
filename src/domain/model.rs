//! Regression models over signal-set features.
//!
//! A [`Model`] bundles everything needed to reproduce a prediction: the
//! feature and label expressions, the fitted regressor and the scalers fitted
//! on its training data. Models serialize to JSON.

use crate::domain::error::NjordError;
use crate::domain::evaluator::Evaluator;
use crate::domain::registry::{FetchOptions, SignalRegistry};
use crate::domain::scaler::StandardScaler;
use crate::domain::signal_expr::SignalExpr;
use crate::domain::signal_set::Dataset;
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub trait Regressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), NjordError>;

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.outer_iter().map(|row| self.predict_row(row)).collect()
    }

    /// Relative weight of each feature, summing to 1 (or all zero).
    fn feature_importances(&self) -> Vec<f64>;
}

/// Linear least squares with an L2 penalty on the coefficients. The
/// intercept is not penalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: Array1::zeros(0),
            intercept: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.coefficients.is_empty()
    }
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Solve `a · w = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, NjordError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(NjordError::Model {
                reason: "singular system, try a larger alpha".into(),
            });
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        let pivot_row = a.row(col).to_owned();
        for row in (col + 1)..n {
            let factor = a[[row, col]] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            a.row_mut(row).scaled_add(-factor, &pivot_row);
            b[row] -= factor * b[col];
        }
    }

    let mut w = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail = a.slice(s![row, row + 1..]).dot(&w.slice(s![row + 1..]));
        w[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(w)
}

impl Regressor for RidgeRegression {
    /// Solves `(XᶜᵀXᶜ + αI) w = Xᶜᵀyᶜ` on mean-centered data, then recovers
    /// the intercept from the means.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), NjordError> {
        let shape_error = || NjordError::Model {
            reason: format!("cannot fit {} rows against {} targets", x.nrows(), y.len()),
        };
        if x.nrows() != y.len() {
            return Err(shape_error());
        }
        let (Some(x_mean), Some(y_mean)) = (x.mean_axis(Axis(0)), y.mean()) else {
            return Err(shape_error());
        };

        let xc = &x - &x_mean;
        let yc = &y - y_mean;
        let mut gram = xc.t().dot(&xc);
        gram.diag_mut().mapv_inplace(|d| d + self.alpha);
        let rhs = xc.t().dot(&yc);

        let coefficients = solve(gram, rhs)?;
        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = coefficients;
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.intercept + self.coefficients.dot(&row)
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }

    fn feature_importances(&self) -> Vec<f64> {
        let weights = self.coefficients.mapv(f64::abs);
        let total = weights.sum();
        if total > 0.0 {
            (weights / total).to_vec()
        } else {
            vec![0.0; weights.len()]
        }
    }
}

pub fn mean_squared_error(predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> f64 {
    (&predicted - &actual)
        .mapv(|d| d * d)
        .mean()
        .unwrap_or(f64::NAN)
}

/// Feature names paired with importances, largest first.
pub fn ranked_importances(names: &[String], importances: &[f64]) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names.iter().cloned().zip(importances.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub display_name: String,
    pub features: Vec<SignalExpr>,
    pub labels: Vec<SignalExpr>,
    /// Column order the regressor was fitted on.
    pub feature_names: Vec<String>,
    pub regressor: RidgeRegression,
    pub x_scaler: StandardScaler,
    pub y_scaler: StandardScaler,
    pub created: NaiveDateTime,
    pub validation_mse: Option<f64>,
}

impl Model {
    pub fn to_json(&self) -> Result<String, NjordError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, NjordError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Predict from an already scaled feature row, in label units.
    pub fn predict_scaled_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.y_scaler
            .inverse_transform_value(self.regressor.predict_row(row))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub id: String,
    pub display_name: String,
    pub features: Vec<SignalExpr>,
    pub labels: Vec<SignalExpr>,
    pub alpha: f64,
    /// Share of rows held out for validation, in `[0, 1)`.
    pub validation_ratio: f64,
    pub seed: u64,
}

/// Evaluate the configured signals over `options`, pool every symbol's rows,
/// standardize, hold out a seeded validation split and fit a ridge model.
pub fn train_model(
    registry: &SignalRegistry,
    options: &FetchOptions,
    config: &TrainConfig,
) -> Result<Model, NjordError> {
    if config.labels.is_empty() {
        return Err(NjordError::Model {
            reason: "training needs at least one label".into(),
        });
    }
    let sets = Evaluator::new(registry, options.clone())
        .fetch_signal_set(&config.features, &config.labels)?;

    let mut pooled = Dataset::default();
    for (symbol, set) in &sets {
        match set.dataset() {
            Ok(data) => {
                info!(%symbol, rows = data.len(), "collected training rows");
                pooled.extend(data)?;
            }
            Err(e) => warn!(%symbol, error = %e, "skipping symbol"),
        }
    }
    if pooled.is_empty() {
        return Err(NjordError::NoData {
            symbol: options.symbols.iter().cloned().collect::<Vec<_>>().join(","),
        });
    }

    let scaled = pooled.scale();
    let mut order: Vec<usize> = (0..scaled.data.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(config.seed));
    let holdout = ((scaled.data.len() as f64) * config.validation_ratio.clamp(0.0, 0.9)) as usize;
    let (valid_idx, train_idx) = order.split_at(holdout);

    let x_train = scaled.data.x.select(Axis(0), train_idx);
    let y_train = scaled.data.y.select(Axis(0), train_idx);
    let mut regressor = RidgeRegression::new(config.alpha);
    regressor.fit(x_train.view(), y_train.view())?;

    let validation_mse = if valid_idx.is_empty() {
        None
    } else {
        let unscale = |v: f64| scaled.y_scaler.inverse_transform_value(v);
        let predicted = regressor
            .predict(scaled.data.x.select(Axis(0), valid_idx).view())
            .mapv(unscale);
        let actual = scaled.data.y.select(Axis(0), valid_idx).mapv(unscale);
        Some(mean_squared_error(predicted.view(), actual.view()))
    };

    info!(
        model = %config.id,
        train_rows = train_idx.len(),
        validation_rows = valid_idx.len(),
        mse = ?validation_mse,
        "trained model"
    );
    for (name, importance) in
        ranked_importances(&scaled.data.feature_names, &regressor.feature_importances())
            .into_iter()
            .take(10)
    {
        info!(feature = %name, importance, "feature importance");
    }

    Ok(Model {
        id: config.id.clone(),
        display_name: config.display_name.clone(),
        features: config.features.clone(),
        labels: config.labels.clone(),
        feature_names: scaled.data.feature_names.clone(),
        regressor,
        x_scaler: scaled.x_scaler,
        y_scaler: scaled.y_scaler,
        created: chrono::Utc::now().naive_utc(),
        validation_mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn ridge_recovers_linear_relation() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| 2.0 * v) - x.column(1).mapv(|v| 3.0 * v) + 5.0;
        let mut model = RidgeRegression::new(1e-9);
        model.fit(x.view(), y.view()).unwrap();
        assert_relative_eq!(model.coefficients[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(model.coefficients[1], -3.0, epsilon = 1e-6);
        assert_relative_eq!(model.intercept, 5.0, epsilon = 1e-6);
        assert_relative_eq!(model.predict_row(array![10.0, 1.0].view()), 22.0, epsilon = 1e-6);
        let batch = model.predict(x.view());
        assert_relative_eq!(batch[7], y[7], epsilon = 1e-6);
    }

    #[test]
    fn ridge_penalty_shrinks_coefficients() {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 3.0 * v);
        let mut loose = RidgeRegression::new(0.0);
        let mut tight = RidgeRegression::new(100.0);
        loose.fit(x.view(), y.view()).unwrap();
        tight.fit(x.view(), y.view()).unwrap();
        assert!(tight.coefficients[0].abs() < loose.coefficients[0].abs());
    }

    #[test]
    fn ridge_singular_without_penalty() {
        // Duplicate column makes the gram matrix singular.
        let x = Array2::from_shape_fn((5, 2), |(i, _)| i as f64);
        let y = Array1::from_iter((0..5).map(|i| i as f64));
        let mut model = RidgeRegression::new(0.0);
        assert!(matches!(model.fit(x.view(), y.view()), Err(NjordError::Model { .. })));
        let mut ridge = RidgeRegression::new(1.0);
        assert!(ridge.fit(x.view(), y.view()).is_ok());
    }

    #[test]
    fn ridge_rejects_mismatched_or_empty_input() {
        let mut model = RidgeRegression::default();
        let x = Array2::<f64>::zeros((3, 2));
        assert!(model.fit(x.view(), Array1::<f64>::zeros(2).view()).is_err());
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(model.fit(empty.view(), Array1::<f64>::zeros(0).view()).is_err());
        assert!(!model.is_fitted());
    }

    #[test]
    fn importances_sum_to_one() {
        let model = RidgeRegression {
            alpha: 1.0,
            coefficients: array![1.0, -3.0],
            intercept: 0.0,
        };
        assert_eq!(model.feature_importances(), vec![0.25, 0.75]);
        let ranked = ranked_importances(&["a".into(), "b".into()], &model.feature_importances());
        assert_eq!(ranked[0].0, "b");
    }

    #[test]
    fn mse_basic() {
        assert_relative_eq!(mean_squared_error(array![1.0, 3.0].view(), array![2.0, 1.0].view()), 2.5);
        assert!(mean_squared_error(Array1::<f64>::zeros(0).view(), Array1::<f64>::zeros(0).view()).is_nan());
    }

    #[test]
    fn model_json_round_trip() {
        let model = Model {
            id: "m1".into(),
            display_name: "Test".into(),
            features: vec!["rsi(base=candles[close])".parse().unwrap()],
            labels: vec!["percent_change<window=5>(base=candles[close])".parse().unwrap()],
            feature_names: vec!["rsi(base=candles[close])".into()],
            regressor: RidgeRegression {
                alpha: 1.0,
                coefficients: array![0.5],
                intercept: 0.1,
            },
            x_scaler: StandardScaler::fit_column(array![1.0, 2.0].view()),
            y_scaler: StandardScaler::fit_column(array![3.0, 5.0].view()),
            created: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            validation_mse: Some(0.5),
        };
        let json = model.to_json().unwrap();
        assert!(json.contains("\"rsi(base=candles[close])\""));
        let loaded = Model::from_json(&json).unwrap();
        assert_eq!(loaded, model);
        assert_relative_eq!(loaded.predict_scaled_row(array![2.0].view()), model.predict_scaled_row(array![2.0].view()));
    }
}
