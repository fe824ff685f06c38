//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::domain::interval::{TimeRange, format_datetime, midnight, parse_datetime};
use crate::domain::prediction::Prediction;
use crate::ports::model_port::PredictionQuery;

use super::{AppState, WebError};

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub tickers: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "modelId")]
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub model_id: String,
    pub created_date: String,
    pub predict_from_date: String,
    pub ticker: String,
    pub prediction: f64,
}

impl From<Prediction> for PredictionView {
    fn from(p: Prediction) -> Self {
        Self {
            model_id: p.model_id,
            created_date: format_datetime(p.created_date),
            predict_from_date: format_datetime(p.predict_from_date),
            ticker: p.symbol,
            prediction: p.prediction,
        }
    }
}

/// Candles for one ticker as parallel columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleColumns {
    pub date: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictionsResponse {
    ByTicker(BTreeMap<String, Vec<PredictionView>>),
    All(Vec<PredictionView>),
}

fn parse_tickers(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A bare end date covers the whole day.
fn parse_range(start: &str, end: &str) -> Result<TimeRange, WebError> {
    let start = parse_datetime(start)
        .map_err(|e| WebError::bad_request(format!("invalid startDate: {}", e.message)))?;
    let end_time: NaiveDateTime = match NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d") {
        Ok(date) => midnight(date) + Duration::days(1) - Duration::seconds(1),
        Err(_) => parse_datetime(end)
            .map_err(|e| WebError::bad_request(format!("invalid endDate: {}", e.message)))?,
    };
    Ok(TimeRange::new(start, end_time))
}

pub async fn predictions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<PredictionsResponse>, WebError> {
    let range = parse_range(&params.start_date, &params.end_date)?;
    let tickers = params.tickers.as_deref().map(parse_tickers);

    let found = state.models.get_predictions(&PredictionQuery {
        symbols: tickers.clone(),
        range,
        model_id: params.model_id,
    })?;

    let response = match tickers {
        Some(tickers) => {
            let mut by_ticker: BTreeMap<String, Vec<PredictionView>> =
                tickers.into_iter().map(|t| (t, Vec::new())).collect();
            for p in found {
                by_ticker.entry(p.symbol.clone()).or_default().push(p.into());
            }
            PredictionsResponse::ByTicker(by_ticker)
        }
        None => PredictionsResponse::All(found.into_iter().map(Into::into).collect()),
    };
    Ok(Json(response))
}

pub async fn daily_candlesticks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<BTreeMap<String, CandleColumns>>, WebError> {
    let tickers = params
        .tickers
        .as_deref()
        .map(parse_tickers)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| WebError::bad_request("tickers is required"))?;
    let range = parse_range(&params.start_date, &params.end_date)?;

    let candles = state.candles.fetch_candles(&tickers, &range, state.interval)?;
    let mut out: BTreeMap<String, CandleColumns> = tickers
        .into_iter()
        .map(|t| (t, CandleColumns::default()))
        .collect();
    for c in candles {
        let columns = out.entry(c.symbol.clone()).or_default();
        columns.date.push(c.time.format("%Y-%m-%d").to_string());
        columns.open.push(c.open);
        columns.high.push(c.high);
        columns.low.push(c.low);
        columns.close.push(c.close);
        columns.volume.push(c.volume);
    }
    Ok(Json(out))
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}
