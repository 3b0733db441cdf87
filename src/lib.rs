//! Mobile App Rating Prediction API
//!
//! Serves a pre-trained regression model that predicts an app's user
//! rating (1.0 - 5.0) from a handful of store-listing characteristics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  APP RATING API                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /predict ──▶ Feature Validator ──▶ Inference Pipeline  │
//! │                    (features)            (model::pipeline)   │
//! │                                           │                  │
//! │  GET /health, /model-info ────────────────┤                  │
//! │                                           ▼                  │
//! │                                    Artifact Store            │
//! │                                    (saved_model/*.json)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod model;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};
use model::{DirArtifactStore, InferencePipeline, LoadOptions};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    pub config: Config,
}

impl AppState {
    /// Load the model from the configured directory.
    pub fn from_config(config: Config) -> Self {
        let store = Arc::new(DirArtifactStore::new(config.model_dir.clone()));
        let options = LoadOptions {
            preload_preprocessor: config.preload_preprocessor,
        };
        let pipeline = InferencePipeline::load(store, options);

        Self {
            pipeline: Arc::new(pipeline),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root::info))
        .route("/health", get(handlers::health::check))
        .route("/model-info", get(handlers::model_info::get))
        .route("/predict", post(handlers::predict::predict))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
