//! Artifact Store - read-only access to the trained model files
//!
//! The store holds three named objects: `metadata`, `best_model` and,
//! for models that do not bundle their preprocessing, `preprocessor`.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::estimator::{ColumnTransformer, Estimator};
use super::metadata::ModelMetadata;

pub const METADATA_FILE: &str = "metadata.json";
pub const MODEL_FILE: &str = "best_model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Source of model artifacts. Implementations must be safe to share
/// across request handlers.
pub trait ArtifactStore: Send + Sync {
    fn metadata(&self) -> Result<ModelMetadata, ArtifactError>;
    fn estimator(&self) -> Result<Estimator, ArtifactError>;
    fn preprocessor(&self) -> Result<ColumnTransformer, ArtifactError>;

    /// Human readable location, for logs.
    fn location(&self) -> String;
}

// ============================================================================
// DIRECTORY STORE
// ============================================================================

/// JSON artifacts in a single directory.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    root: PathBuf,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_value(&self, file: &str) -> Result<(PathBuf, Value), ArtifactError> {
        let path = self.root.join(file);
        let bytes = fs::read(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        let value = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Malformed {
            path: path.clone(),
            source,
        })?;
        Ok((path, value))
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T, ArtifactError> {
        let (path, value) = self.read_value(file)?;
        serde_json::from_value(value).map_err(|source| ArtifactError::Malformed { path, source })
    }
}

impl ArtifactStore for DirArtifactStore {
    fn metadata(&self) -> Result<ModelMetadata, ArtifactError> {
        let metadata: ModelMetadata = self.read(METADATA_FILE)?;
        metadata.check().map_err(|reason| ArtifactError::Invalid {
            name: "metadata",
            reason,
        })?;
        Ok(metadata)
    }

    fn estimator(&self) -> Result<Estimator, ArtifactError> {
        let (path, value) = self.read_value(MODEL_FILE)?;
        Estimator::from_value(value).map_err(|source| ArtifactError::Malformed { path, source })
    }

    fn preprocessor(&self) -> Result<ColumnTransformer, ArtifactError> {
        self.read(PREPROCESSOR_FILE)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
