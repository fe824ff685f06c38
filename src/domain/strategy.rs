//! Trading strategies: from a window of candles to buy, sell or hold.

use crate::domain::candle::Candle;
use crate::domain::error::NjordError;
use crate::domain::evaluator::Evaluator;
use crate::domain::fetchers::MemoryFetcher;
use crate::domain::interval::TimeRange;
use crate::domain::model::{Model, Regressor, RidgeRegression, ranked_importances};
use crate::domain::presets::{price_change_label, technical_features};
use crate::domain::registry::{FetchOptions, SignalRegistry};
use crate::domain::scaler::StandardScaler;
use crate::domain::signal_expr::SignalExpr;
use crate::domain::signal_set::SignalSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Buy,
    Sell,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionKind::Buy => write!(f, "buy"),
            DecisionKind::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub kind: DecisionKind,
    pub quantity: u32,
}

impl Decision {
    pub fn buy(quantity: u32) -> Self {
        Self {
            kind: DecisionKind::Buy,
            quantity,
        }
    }

    pub fn sell(quantity: u32) -> Self {
        Self {
            kind: DecisionKind::Sell,
            quantity,
        }
    }
}

/// Buy one share above `cutoff - bias`, sell one below `-cutoff - bias`.
pub fn threshold_decision(score: f64, cutoff: f64, bias: f64) -> Option<Decision> {
    if score > cutoff - bias {
        Some(Decision::buy(1))
    } else if score < -cutoff - bias {
        Some(Decision::sell(1))
    } else {
        None
    }
}

/// `execute` must be a pure function of the history so the backtest can call
/// it from many threads.
pub trait Strategy: Sync {
    fn train(&mut self, _history: &[Candle]) -> Result<(), NjordError> {
        Ok(())
    }

    fn execute(&self, history: &[Candle]) -> Result<Option<Decision>, NjordError>;
}

/// Ridge model over signal features, evaluated on the candle history passed
/// in. The history is served to the evaluator under the `leaf` fetcher id.
///
/// The prediction is compared with the thresholds in standardized label
/// units, so a cutoff of 2 means two standard deviations of the training
/// labels.
#[derive(Clone)]
pub struct SignalModelStrategy {
    registry: SignalRegistry,
    leaf: String,
    features: Vec<SignalExpr>,
    labels: Vec<SignalExpr>,
    regressor: RidgeRegression,
    feature_names: Vec<String>,
    x_scaler: StandardScaler,
    pub cutoff: f64,
    pub bias: f64,
    pretrained: bool,
}

impl SignalModelStrategy {
    pub const DEFAULT_CUTOFF: f64 = 2.0;
    pub const TECHNICAL_CUTOFF: f64 = 3.0;

    pub fn new(
        registry: SignalRegistry,
        leaf: impl Into<String>,
        features: Vec<SignalExpr>,
        label_window: i64,
        alpha: f64,
    ) -> Self {
        let leaf = leaf.into();
        let labels = vec![price_change_label(&leaf, label_window)];
        Self {
            registry,
            leaf,
            features,
            labels,
            regressor: RidgeRegression::new(alpha),
            feature_names: Vec::new(),
            x_scaler: StandardScaler::default(),
            cutoff: Self::DEFAULT_CUTOFF,
            bias: 0.0,
            pretrained: false,
        }
    }

    /// The technical preset predicting `label_window` bars ahead.
    pub fn technical(
        registry: SignalRegistry,
        leaf: impl Into<String>,
        label_window: i64,
        alpha: f64,
    ) -> Self {
        let leaf = leaf.into();
        let features = technical_features(&leaf);
        Self::new(registry, leaf, features, label_window, alpha).with_thresholds(Self::TECHNICAL_CUTOFF, 0.0)
    }

    /// Wrap a stored model. Training becomes a no-op.
    pub fn from_model(registry: SignalRegistry, leaf: impl Into<String>, model: &Model) -> Self {
        Self {
            registry,
            leaf: leaf.into(),
            features: model.features.clone(),
            labels: model.labels.clone(),
            regressor: model.regressor.clone(),
            feature_names: model.feature_names.clone(),
            x_scaler: model.x_scaler.clone(),
            cutoff: Self::DEFAULT_CUTOFF,
            bias: 0.0,
            pretrained: true,
        }
    }

    pub fn with_thresholds(mut self, cutoff: f64, bias: f64) -> Self {
        self.cutoff = cutoff;
        self.bias = bias;
        self
    }

    pub fn features(&self) -> &[SignalExpr] {
        &self.features
    }

    fn signal_set(
        &self,
        history: &[Candle],
        labels: &[SignalExpr],
    ) -> Result<Option<SignalSet>, NjordError> {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Ok(None);
        };
        let mut registry = self.registry.clone();
        registry.register_fetcher(self.leaf.clone(), MemoryFetcher::from_candles(history))?;
        let options = FetchOptions::new([first.symbol.as_str()], TimeRange::new(first.time, last.time));
        let mut sets = Evaluator::new(&registry, options).fetch_signal_set(&self.features, labels)?;
        Ok(sets.remove(&first.symbol))
    }
}

impl Strategy for SignalModelStrategy {
    fn train(&mut self, history: &[Candle]) -> Result<(), NjordError> {
        if self.pretrained {
            debug!("pretrained strategy, skipping training");
            return Ok(());
        }
        let symbol = history.first().map(|c| c.symbol.clone()).unwrap_or_default();
        let set = self
            .signal_set(history, &self.labels)?
            .ok_or_else(|| NjordError::NoData {
                symbol: symbol.clone(),
            })?;
        let scaled = set.to_xy()?;
        self.regressor.fit(scaled.data.x.view(), scaled.data.y.view())?;
        info!(%symbol, rows = scaled.data.len(), "trained strategy model");
        for (name, importance) in
            ranked_importances(&scaled.data.feature_names, &self.regressor.feature_importances())
        {
            debug!(feature = %name, importance, "feature importance");
        }
        self.feature_names = scaled.data.feature_names;
        self.x_scaler = scaled.x_scaler;
        Ok(())
    }

    fn execute(&self, history: &[Candle]) -> Result<Option<Decision>, NjordError> {
        if !self.regressor.is_fitted() {
            return Err(NjordError::Model {
                reason: "strategy executed before training".into(),
            });
        }
        let Some(set) = self.signal_set(history, &[])? else {
            return Ok(None);
        };
        let (_, rows) = set.to_x_with(&self.feature_names, &self.x_scaler)?;
        Ok(rows
            .outer_iter()
            .last()
            .and_then(|row| threshold_decision(self.regressor.predict_row(row), self.cutoff, self.bias)))
    }
}

/// Uniform noise in `[-1, 1)` per bar, reproducible from the seed and the
/// history length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomStrategy {
    pub cutoff: f64,
    pub seed: u64,
}

impl RandomStrategy {
    pub const DEFAULT_CUTOFF: f64 = 0.7;

    pub fn new(seed: u64) -> Self {
        Self {
            cutoff: Self::DEFAULT_CUTOFF,
            seed,
        }
    }
}

impl Strategy for RandomStrategy {
    fn execute(&self, history: &[Candle]) -> Result<Option<Decision>, NjordError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(history.len() as u64));
        let draw: f64 = rng.gen_range(-1.0..1.0);
        Ok(threshold_decision(draw, self.cutoff, 0.0))
    }
}
