use axum::{extract::State, Json};
use sa_core::FinalReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub ticker: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// POST /analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<FinalReport>, ApiError> {
    let ticker = req.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ApiError::BadRequest("Ticker cannot be empty".into()));
    }

    info!("📨 Analysis requested for {}", ticker);
    let report = state
        .pipeline
        .run(&ticker, state.articles_to_fetch, state.articles_to_inference)
        .await?;
    Ok(Json(report))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
