//! Price-change predictions from stored models.

use crate::domain::error::NjordError;
use crate::domain::evaluator::Evaluator;
use crate::domain::interval::TimeRange;
use crate::domain::model::Model;
use crate::domain::registry::{FetchOptions, SignalRegistry};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Days of history evaluated before the prediction date, enough for the
/// slowest indicators in the technical preset to warm up.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub model_id: String,
    pub created_date: NaiveDateTime,
    /// Timestamp of the feature row the prediction was made from.
    pub predict_from_date: NaiveDateTime,
    pub symbol: String,
    pub prediction: f64,
}

/// Predict the model's label for each symbol from the last complete feature
/// row at or before `predict_from`.
pub fn predict_price_change(
    model: &Model,
    registry: &SignalRegistry,
    symbols: &BTreeSet<String>,
    predict_from: NaiveDateTime,
    lookback_days: i64,
) -> Result<Vec<Prediction>, NjordError> {
    let options = FetchOptions {
        symbols: symbols.clone(),
        range: TimeRange::lookback(predict_from, Duration::days(lookback_days)),
    };
    let sets = Evaluator::new(registry, options).fetch_signal_set(&model.features, &[])?;
    let created_date = chrono::Utc::now().naive_utc();

    let mut predictions = Vec::new();
    for (symbol, set) in &sets {
        let (dates, rows) = match set.to_x_with(&model.feature_names, &model.x_scaler) {
            Ok(x) => x,
            Err(e) => {
                warn!(%symbol, error = %e, "cannot build features");
                continue;
            }
        };
        let Some((date, row)) = dates.last().zip(rows.outer_iter().last()) else {
            warn!(%symbol, "no complete feature row");
            continue;
        };
        let prediction = model.predict_scaled_row(row);
        info!(%symbol, model = %model.id, from = %date, prediction, "predicted");
        predictions.push(Prediction {
            model_id: model.id.clone(),
            created_date,
            predict_from_date: *date,
            symbol: symbol.clone(),
            prediction,
        });
    }
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::fetchers::MemoryFetcher;
    use crate::domain::model::RidgeRegression;
    use crate::domain::scaler::StandardScaler;
    use chrono::NaiveDate;
    use ndarray::array;

    fn day(n: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(n)
    }

    fn registry() -> SignalRegistry {
        let candles: Vec<Candle> = (0..10)
            .map(|i| Candle {
                symbol: "AAA".into(),
                time: day(i),
                open: 10.0 + i as f64,
                high: 11.0 + i as f64,
                low: 9.0 + i as f64,
                close: 10.0 + i as f64,
                volume: 100.0,
            })
            .collect();
        let mut registry = SignalRegistry::standard().unwrap();
        registry
            .register_fetcher("candles", MemoryFetcher::from_candles(&candles))
            .unwrap();
        registry
    }

    fn model() -> Model {
        Model {
            id: "close-model".into(),
            display_name: "Close".into(),
            features: vec!["candles[close]".parse().unwrap()],
            labels: vec!["percent_change(base=candles[close])".parse().unwrap()],
            feature_names: vec!["candles[close]".into()],
            regressor: RidgeRegression {
                alpha: 1.0,
                coefficients: array![1.0],
                intercept: 0.0,
            },
            x_scaler: StandardScaler::identity(1),
            y_scaler: StandardScaler {
                mean: array![1.0],
                scale: array![2.0],
            },
            created: day(0),
            validation_mse: None,
        }
    }

    #[test]
    fn predicts_from_last_row_before_date() {
        let symbols: BTreeSet<String> = ["AAA".to_string(), "ZZZ".to_string()].into();
        let predictions =
            predict_price_change(&model(), &registry(), &symbols, day(5), 30).unwrap();
        assert_eq!(predictions.len(), 1);
        let p = &predictions[0];
        assert_eq!(p.symbol, "AAA");
        assert_eq!(p.predict_from_date, day(5));
        // close 15, unscaled x, y = 15 * 2 + 1
        assert_eq!(p.prediction, 31.0);
    }

    #[test]
    fn no_history_yields_nothing() {
        let symbols: BTreeSet<String> = ["AAA".to_string()].into();
        let early = day(-100);
        let predictions = predict_price_change(&model(), &registry(), &symbols, early, 10).unwrap();
        assert!(predictions.is_empty());
    }
}
