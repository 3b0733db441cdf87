//! Model info handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::model::ModelKind;
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct Performance {
    test_rmse: f64,
    test_r2: f64,
    test_mae: f64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    model_name: String,
    model_type: ModelKind,
    features: Vec<String>,
    performance: Performance,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Describe the loaded model
pub async fn get(State(state): State<AppState>) -> AppResult<Json<ModelInfoResponse>> {
    let meta = state.pipeline.describe()?;

    Ok(Json(ModelInfoResponse {
        model_name: meta.model_name.clone(),
        model_type: meta.model_type,
        features: meta.features.clone(),
        performance: Performance {
            test_rmse: round4(meta.test_rmse),
            test_r2: round4(meta.test_r2),
            test_mae: round4(meta.test_mae),
        },
    }))
}

