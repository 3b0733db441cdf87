//! Root info handler

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Endpoints {
    docs: &'static str,
    predict: &'static str,
    health: &'static str,
    model_info: &'static str,
}

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    version: &'static str,
    status: &'static str,
    endpoints: Endpoints,
}

pub async fn info() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Mobile App Rating Prediction API",
        version: env!("CARGO_PKG_VERSION"),
        status: "active",
        endpoints: Endpoints {
            docs: "/",
            predict: "/predict (POST)",
            health: "/health",
            model_info: "/model-info",
        },
    })
}
