//! Model Module - artifact loading and inference
//!
//! Keeps the estimator math, the artifact store and the serving
//! pipeline apart so a new model family only touches `estimator`.

pub mod artifacts;
pub mod estimator;
pub mod metadata;
pub mod pipeline;
pub mod postprocess;

// Re-export common types
pub use artifacts::{ArtifactError, ArtifactStore, DirArtifactStore};
pub use estimator::{ColumnTransformer, Estimator, ModelInput};
pub use metadata::{ModelKind, ModelMetadata};
pub use pipeline::{HealthReport, HealthStatus, InferencePipeline, LoadOptions, PipelineError, Prediction};
pub use postprocess::Confidence;
