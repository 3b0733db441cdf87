//! Prediction handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::features::{self, RawFeatures};
use crate::model::Prediction;
use crate::{AppError, AppResult, AppState};

/// Predict an app rating from its characteristics
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<RawFeatures>, JsonRejection>,
) -> AppResult<Json<Prediction>> {
    let Json(raw) = body.map_err(|e| AppError::MalformedBody(e.body_text()))?;

    // Reject bad input before touching the model.
    let features = features::validate(&raw)?;

    // A lazy preprocessor load reads from disk; keep it off the async workers.
    let pipeline = state.pipeline.clone();
    let prediction = tokio::task::spawn_blocking(move || pipeline.predict(&features)).await??;

    tracing::debug!(
        "Predicted {} ({:?}) with {}",
        prediction.predicted_rating,
        prediction.confidence,
        prediction.model_name
    );

    Ok(Json(prediction))
}
