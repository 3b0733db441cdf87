//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::model::{HealthStatus, ModelKind};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: HealthStatus,
    model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_type: Option<ModelKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    inference_count: u64,
    avg_latency_ms: f64,
    timestamp: i64,
}

/// Always 200; an unloaded model is reported in the body.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.pipeline.health();

    Json(HealthResponse {
        message: (!report.model_loaded).then_some("Model not loaded"),
        status: report.status,
        model_loaded: report.model_loaded,
        model_name: report.model_name,
        model_type: report.model_type,
        inference_count: report.inference_count,
        avg_latency_ms: report.avg_latency_ms,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
