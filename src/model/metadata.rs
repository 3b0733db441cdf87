//! Model metadata produced by the training run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of model-input columns every artifact set must declare.
pub const FEATURE_COUNT: usize = 6;

/// Model family discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Linear model trained with SGD; ships its preprocessor separately.
    Sgd,
    LinearRegression,
    DecisionTree,
    RandomForest,
}

impl ModelKind {
    /// True when the estimator artifact does not bundle its own preprocessing.
    pub fn requires_preprocessor(self) -> bool {
        matches!(self, ModelKind::Sgd)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Sgd => "sgd",
            ModelKind::LinearRegression => "linear_regression",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Display name, e.g. "Random Forest Regressor".
    pub model_name: String,
    pub model_type: ModelKind,
    pub test_rmse: f64,
    pub test_r2: f64,
    pub test_mae: f64,
    /// Model-input column names, in order.
    pub features: Vec<String>,
}

impl ModelMetadata {
    /// Sanity checks applied at load time.
    pub fn check(&self) -> Result<(), String> {
        if self.model_name.trim().is_empty() {
            return Err("model_name is empty".to_string());
        }

        for (name, value) in [
            ("test_rmse", self.test_rmse),
            ("test_r2", self.test_r2),
            ("test_mae", self.test_mae),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }

        if self.features.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} feature names, got {}",
                FEATURE_COUNT,
                self.features.len()
            ));
        }

        Ok(())
    }
}
