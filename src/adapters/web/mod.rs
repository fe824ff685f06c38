//! HTTP API adapter.
//!
//! Serves stored predictions and daily candles as JSON for the frontend, and
//! the frontend's static build directory.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use crate::domain::error::NjordError;
use crate::domain::interval::Interval;
use crate::ports::data_port::CandleStore;
use crate::ports::model_port::ModelStore;
use axum::{Router, routing::get};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub candles: Arc<dyn CandleStore>,
    pub models: Arc<dyn ModelStore>,
    /// Interval served by `/api/daily_candlesticks`.
    pub interval: Interval,
}

pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api/predictions", get(handlers::predictions))
        .route("/api/daily_candlesticks", get(handlers::daily_candlesticks))
        .with_state(Arc::new(state));

    match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api.fallback(handlers::not_found),
    }
}

pub async fn serve(
    state: AppState,
    listen: &str,
    static_dir: Option<PathBuf>,
) -> Result<(), NjordError> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(address = %listen, "serving");
    axum::serve(listener, build_router(state, static_dir)).await?;
    Ok(())
}
