//! Inference Pipeline
//!
//! Owns the loaded model for the life of the process.
//!
//! Lifecycle: [`InferencePipeline::load`] reads the artifact store once.
//! On success the pipeline is `Ready`; on any failure it stays `Unloaded`
//! until the process is restarted. Dropping the pipeline releases the model.
//! The only mutation after load is the lazily cached preprocessor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

use super::artifacts::{ArtifactError, ArtifactStore};
use super::estimator::{ColumnTransformer, Estimator, ModelInput};
use super::metadata::{ModelKind, ModelMetadata};
use super::postprocess::{finalize, Confidence};
use crate::features::AppFeatures;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Load-time options.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Load the separate preprocessor at startup for kinds that need one.
    pub preload_preprocessor: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            preload_preprocessor: true,
        }
    }
}

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_rating: f64,
    pub model_name: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health view of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,
    pub model_name: Option<String>,
    pub model_type: Option<ModelKind>,
    pub inference_count: u64,
    pub avg_latency_ms: f64,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("model not loaded")]
    ModelUnavailable,

    #[error("model metadata not available")]
    MetadataUnavailable,

    #[error("{0}")]
    Inference(String),
}

// ============================================================================
// STATE
// ============================================================================

struct LoadedModel {
    metadata: ModelMetadata,
    estimator: Estimator,
    /// Separate preprocessor, set at load or on first use.
    preprocessor: RwLock<Option<Arc<ColumnTransformer>>>,
}

enum PipelineState {
    Unloaded { reason: String },
    Ready(LoadedModel),
}

/// Latency stats
#[derive(Default)]
struct InferenceStats {
    latency_sum_us: AtomicU64,
    count: AtomicU64,
}

pub struct InferencePipeline {
    state: PipelineState,
    store: Arc<dyn ArtifactStore>,
    stats: InferenceStats,
}

impl InferencePipeline {
    /// Load the model from `store`. Never fails: a load error leaves the
    /// pipeline permanently unloaded and is logged.
    pub fn load(store: Arc<dyn ArtifactStore>, options: LoadOptions) -> Self {
        tracing::info!("Loading model artifacts from: {}", store.location());

        let state = match Self::read_artifacts(store.as_ref(), options) {
            Ok(loaded) => {
                let meta = &loaded.metadata;
                tracing::info!("Model loaded successfully: {} ({})", meta.model_name, meta.model_type);
                tracing::info!("Test RMSE: {:.4}", meta.test_rmse);
                tracing::info!("Test R²: {:.4}", meta.test_r2);
                PipelineState::Ready(loaded)
            }
            Err(e) => {
                tracing::error!("Failed to load model: {}", e);
                tracing::error!("Make sure the model files are in {}", store.location());
                PipelineState::Unloaded { reason: e.to_string() }
            }
        };

        Self {
            state,
            store,
            stats: InferenceStats::default(),
        }
    }

    fn read_artifacts(store: &dyn ArtifactStore, options: LoadOptions) -> Result<LoadedModel, ArtifactError> {
        let metadata = store.metadata()?;
        let estimator = store.estimator()?;

        // The kind selects the estimator variant.
        let kind = metadata.model_type;
        if kind.requires_preprocessor() != estimator.needs_external_preprocessor() {
            let expected = if kind.requires_preprocessor() { "a bare regressor" } else { "a bundled pipeline" };
            return Err(ArtifactError::Invalid {
                name: "best_model",
                reason: format!("model_type {} must ship {}", kind, expected),
            });
        }

        let preprocessor = if kind.requires_preprocessor() && options.preload_preprocessor {
            Some(Arc::new(store.preprocessor()?))
        } else {
            None
        };

        Ok(LoadedModel {
            metadata,
            estimator,
            preprocessor: RwLock::new(preprocessor),
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, PipelineState::Ready(_))
    }

    /// Why the pipeline is unloaded, if it is.
    pub fn load_error(&self) -> Option<&str> {
        match &self.state {
            PipelineState::Unloaded { reason } => Some(reason),
            PipelineState::Ready(_) => None,
        }
    }

    pub fn health(&self) -> HealthReport {
        let count = self.stats.count.load(Ordering::Relaxed);
        let sum = self.stats.latency_sum_us.load(Ordering::Relaxed);
        let avg_latency_ms = if count > 0 { (sum as f64 / count as f64) / 1000.0 } else { 0.0 };

        match &self.state {
            PipelineState::Ready(loaded) => HealthReport {
                status: HealthStatus::Healthy,
                model_loaded: true,
                model_name: Some(loaded.metadata.model_name.clone()),
                model_type: Some(loaded.metadata.model_type),
                inference_count: count,
                avg_latency_ms,
            },
            PipelineState::Unloaded { .. } => HealthReport {
                status: HealthStatus::Unhealthy,
                model_loaded: false,
                model_name: None,
                model_type: None,
                inference_count: count,
                avg_latency_ms,
            },
        }
    }

    pub fn describe(&self) -> Result<&ModelMetadata, PipelineError> {
        match &self.state {
            PipelineState::Ready(loaded) => Ok(&loaded.metadata),
            PipelineState::Unloaded { .. } => Err(PipelineError::MetadataUnavailable),
        }
    }

    /// Predict a rating for one canonical feature record.
    pub fn predict(&self, features: &AppFeatures) -> Result<Prediction, PipelineError> {
        let PipelineState::Ready(loaded) = &self.state else {
            return Err(PipelineError::ModelUnavailable);
        };

        let start = Instant::now();

        ModelInput::check_columns(&loaded.metadata.features).map_err(inference_error)?;
        let input = ModelInput::from_features(features);

        let raw = match &loaded.estimator {
            Estimator::SelfContained(_) => loaded.estimator.predict(&input, None),
            Estimator::External(_) => {
                let preprocessor = self.external_preprocessor(loaded)?;
                loaded.estimator.predict(&input, Some(preprocessor.as_ref()))
            }
        }
        .map_err(inference_error)?;

        let (predicted_rating, confidence) = finalize(raw);

        self.stats
            .latency_sum_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.stats.count.fetch_add(1, Ordering::Relaxed);

        Ok(Prediction {
            predicted_rating,
            model_name: loaded.metadata.model_name.clone(),
            confidence,
        })
    }

    /// Cached separate preprocessor, loading it on first use. The write
    /// lock is held across the load so concurrent first requests load it once.
    fn external_preprocessor(&self, loaded: &LoadedModel) -> Result<Arc<ColumnTransformer>, PipelineError> {
        if let Some(preprocessor) = loaded.preprocessor.read().as_ref() {
            return Ok(Arc::clone(preprocessor));
        }

        let mut slot = loaded.preprocessor.write();
        if let Some(preprocessor) = slot.as_ref() {
            return Ok(Arc::clone(preprocessor));
        }

        tracing::info!("Loading preprocessor on demand from: {}", self.store.location());
        let preprocessor = self
            .store
            .preprocessor()
            .map(Arc::new)
            .map_err(|e| inference_error(format!("failed to load preprocessor: {}", e)))?;

        *slot = Some(Arc::clone(&preprocessor));
        Ok(preprocessor)
    }
}

fn inference_error(e: impl ToString) -> PipelineError {
    PipelineError::Inference(e.to_string())
}
