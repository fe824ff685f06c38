//! Model and prediction persistence port trait.

use crate::domain::error::NjordError;
use crate::domain::interval::TimeRange;
use crate::domain::model::Model;
use crate::domain::prediction::Prediction;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub id: String,
    pub display_name: String,
    pub created: NaiveDateTime,
}

/// Filter for stored predictions. `range` applies to `predict_from_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionQuery {
    pub symbols: Option<BTreeSet<String>>,
    pub range: TimeRange,
    pub model_id: Option<String>,
}

pub trait ModelStore: Send + Sync {
    /// Insert or replace a model by id.
    fn save_model(&self, model: &Model) -> Result<(), NjordError>;

    fn get_model(&self, id: &str) -> Result<Option<Model>, NjordError>;

    fn list_models(&self) -> Result<Vec<ModelSummary>, NjordError>;

    fn save_predictions(&self, predictions: &[Prediction]) -> Result<usize, NjordError>;

    /// Matching predictions ordered by symbol then prediction date.
    fn get_predictions(&self, query: &PredictionQuery) -> Result<Vec<Prediction>, NjordError>;
}
