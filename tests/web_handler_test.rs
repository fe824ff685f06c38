#![cfg(feature = "web")]
//! HTTP API tests: routes are driven through the router with `oneshot`.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use http_body_util::BodyExt;
use njord::adapters::sqlite_adapter::SqliteAdapter;
use njord::adapters::web::{AppState, build_router};
use njord::domain::interval::{Interval, midnight};
use njord::domain::prediction::Prediction;
use njord::ports::model_port::ModelStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn prediction(model: &str, symbol: &str, day: u32, value: f64) -> Prediction {
    Prediction {
        model_id: model.into(),
        created_date: midnight(date(2024, 2, 1)),
        predict_from_date: midnight(date(2024, 1, day)),
        symbol: symbol.into(),
        prediction: value,
    }
}

fn create_test_app() -> Router {
    let candles = MockCandleStore::new()
        .with_candles("AAPL", generate_candles("AAPL", "2024-01-01", 10, 100.0))
        .with_candles("MSFT", generate_candles("MSFT", "2024-01-05", 3, 300.0));

    let models = SqliteAdapter::in_memory().unwrap();
    models.initialize_schema().unwrap();
    models
        .save_predictions(&[
            prediction("tech", "AAPL", 2, 1.5),
            prediction("tech", "AAPL", 3, -0.5),
            prediction("tech", "MSFT", 2, 2.0),
            prediction("other", "AAPL", 2, 9.0),
        ])
        .unwrap();

    build_router(
        AppState {
            candles: Arc::new(candles),
            models: Arc::new(models),
            interval: Interval::DAILY,
        },
        None,
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

mod predictions {
    use super::*;

    #[tokio::test]
    async fn grouped_by_requested_ticker() {
        let (status, json) = get(
            create_test_app(),
            "/api/predictions?tickers=aapl,GOOG&startDate=2024-01-01&endDate=2024-01-31&modelId=tech",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let aapl = json["AAPL"].as_array().unwrap();
        assert_eq!(aapl.len(), 2);
        assert_eq!(aapl[0]["model_id"], "tech");
        assert_eq!(aapl[0]["ticker"], "AAPL");
        assert_eq!(aapl[0]["predict_from_date"], "2024-01-02 00:00:00");
        assert_eq!(json["GOOG"].as_array().unwrap().len(), 0);
        assert!(json.get("MSFT").is_none());
    }

    #[tokio::test]
    async fn flat_list_without_tickers() {
        let (status, json) =
            get(create_test_app(), "/api/predictions?startDate=2024-01-01&endDate=2024-01-31").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn bare_end_date_covers_the_whole_day() {
        let (_, json) = get(
            create_test_app(),
            "/api/predictions?tickers=AAPL&startDate=2024-01-03&endDate=2024-01-03&modelId=tech",
        )
        .await;
        let aapl = json["AAPL"].as_array().unwrap();
        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0]["prediction"], -0.5);
    }

    #[tokio::test]
    async fn invalid_date_is_bad_request() {
        let (status, json) =
            get(create_test_app(), "/api/predictions?startDate=yesterday&endDate=2024-01-31").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("startDate"));
    }

    #[tokio::test]
    async fn missing_dates_are_rejected() {
        let (status, _) = get(create_test_app(), "/api/predictions?tickers=AAPL").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod candlesticks {
    use super::*;

    #[tokio::test]
    async fn columns_per_ticker() {
        let (status, json) = get(
            create_test_app(),
            "/api/daily_candlesticks?tickers=AAPL,MSFT,NONE&startDate=2024-01-03&endDate=2024-01-06",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let aapl = &json["AAPL"];
        assert_eq!(
            aapl["date"],
            serde_json::json!(["2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06"])
        );
        assert_eq!(aapl["close"].as_array().unwrap().len(), 4);
        assert_eq!(json["MSFT"]["date"].as_array().unwrap().len(), 2);
        assert_eq!(json["NONE"]["date"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn tickers_are_required() {
        let (status, json) = get(
            create_test_app(),
            "/api/daily_candlesticks?startDate=2024-01-01&endDate=2024-01-31",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "tickers is required");
    }
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, json) = get(create_test_app(), "/api/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "no such route");
}

#[tokio::test]
async fn static_dir_is_served() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>njord</html>").unwrap();
    let app = build_router(
        AppState {
            candles: Arc::new(MockCandleStore::new()),
            models: Arc::new(SqliteAdapter::in_memory().unwrap()),
            interval: Interval::DAILY,
        },
        Some(dir.path().to_path_buf()),
    );

    let response = app
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<html>njord</html>");
}
