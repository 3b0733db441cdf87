//! Estimator - serialized regressors and preprocessing
//!
//! Artifacts are plain JSON exports of the fitted training objects.
//! An estimator is either a bare regressor, which needs an external
//! preprocessor, or a pipeline that bundles its own.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::AppFeatures;

// ============================================================================
// MODEL INPUT
// ============================================================================

/// Model-input column names, in the order the estimators were fitted on.
pub const MODEL_INPUT_COLUMNS: [&str; 6] = [
    "Reviews",
    "Size_MB",
    "Installs_Num",
    "Price_USD",
    "Is_Free",
    "Category",
];

/// Number of numeric columns (everything except `Category`).
pub const NUMERIC_COLUMNS: usize = 5;

/// One model-input row. Category is passed through raw; encoding is the
/// preprocessor's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub reviews: f64,
    pub size_mb: f64,
    pub installs: f64,
    pub price: f64,
    pub is_free: f64,
    pub category: String,
}

impl ModelInput {
    pub fn from_features(features: &AppFeatures) -> Self {
        Self {
            reviews: features.reviews as f64,
            size_mb: features.size_mb,
            installs: features.installs as f64,
            price: features.price,
            is_free: f64::from(features.is_free),
            category: features.category.clone(),
        }
    }

    pub fn numeric(&self) -> [f64; NUMERIC_COLUMNS] {
        [self.reviews, self.size_mb, self.installs, self.price, self.is_free]
    }

    /// Check the row layout against the feature names the model declares.
    pub fn check_columns(expected: &[String]) -> Result<(), EstimatorError> {
        let matches = expected.len() == MODEL_INPUT_COLUMNS.len()
            && expected.iter().zip(MODEL_INPUT_COLUMNS).all(|(e, c)| e == c);
        if matches {
            Ok(())
        } else {
            Err(EstimatorError::ColumnMismatch {
                expected: expected.to_vec(),
            })
        }
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("feature names {expected:?} do not match the model-input layout")]
    ColumnMismatch { expected: Vec<String> },

    #[error("input width mismatch: expected {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("malformed decision tree: {0}")]
    MalformedTree(String),

    #[error("random forest has no trees")]
    EmptyForest,

    #[error("estimator requires an external preprocessor")]
    MissingPreprocessor,

    #[error("prediction is not a finite number")]
    NonFinite,
}

// ============================================================================
// PREPROCESSING
// ============================================================================

/// Standard scaling of the numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// One-hot encoding of the category column; unknown categories encode as zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<String>,
}

/// Column transformer: scaled numerics followed by the one-hot block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub scaler: StandardScaler,
    pub encoder: OneHotEncoder,
}

impl ColumnTransformer {
    pub fn output_width(&self) -> usize {
        NUMERIC_COLUMNS + self.encoder.categories.len()
    }

    pub fn transform(&self, input: &ModelInput) -> Result<Array1<f64>, EstimatorError> {
        let scaler = &self.scaler;
        if scaler.mean.len() != NUMERIC_COLUMNS || scaler.scale.len() != NUMERIC_COLUMNS {
            return Err(EstimatorError::WidthMismatch {
                expected: NUMERIC_COLUMNS,
                actual: scaler.mean.len().min(scaler.scale.len()),
            });
        }

        let mut row = Array1::<f64>::zeros(self.output_width());
        for (i, value) in input.numeric().into_iter().enumerate() {
            // Constant training columns have zero variance.
            let scale = if scaler.scale[i] == 0.0 { 1.0 } else { scaler.scale[i] };
            row[i] = (value - scaler.mean[i]) / scale;
        }

        if let Some(idx) = self
            .encoder
            .categories
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&input.category))
        {
            row[NUMERIC_COLUMNS + idx] = 1.0;
        }

        Ok(row)
    }
}

// ============================================================================
// REGRESSORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegressor {
    pub fn predict(&self, x: ArrayView1<f64>) -> Result<f64, EstimatorError> {
        if x.len() != self.coefficients.len() {
            return Err(EstimatorError::WidthMismatch {
                expected: self.coefficients.len(),
                actual: x.len(),
            });
        }
        Ok(ArrayView1::from(&self.coefficients[..]).dot(&x) + self.intercept)
    }
}

/// Flat-array regression tree. A node is a leaf when its left child is -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

const LEAF: i64 = -1;

impl DecisionTree {
    pub fn predict(&self, x: ArrayView1<f64>) -> Result<f64, EstimatorError> {
        if x.len() != self.n_features {
            return Err(EstimatorError::WidthMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }

        let nodes = self.value.len();
        if nodes == 0
            || self.children_left.len() != nodes
            || self.children_right.len() != nodes
            || self.feature.len() != nodes
            || self.threshold.len() != nodes
        {
            return Err(EstimatorError::MalformedTree("node arrays differ in length".to_string()));
        }

        let mut node = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..nodes {
            let left = self.children_left[node];
            if left == LEAF {
                return Ok(self.value[node]);
            }

            let feature = usize::try_from(self.feature[node])
                .ok()
                .filter(|f| *f < x.len())
                .ok_or_else(|| {
                    EstimatorError::MalformedTree(format!("node {} splits on bad feature", node))
                })?;

            let next = if x[feature] <= self.threshold[node] {
                left
            } else {
                self.children_right[node]
            };

            node = usize::try_from(next)
                .ok()
                .filter(|n| *n < nodes)
                .ok_or_else(|| {
                    EstimatorError::MalformedTree(format!("node {} has bad child {}", node, next))
                })?;
        }

        Err(EstimatorError::MalformedTree("cycle detected".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn predict(&self, x: ArrayView1<f64>) -> Result<f64, EstimatorError> {
        if self.trees.is_empty() {
            return Err(EstimatorError::EmptyForest);
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearRegressor),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Regressor {
    pub fn predict(&self, x: ArrayView1<f64>) -> Result<f64, EstimatorError> {
        match self {
            Regressor::Linear(m) => m.predict(x),
            Regressor::DecisionTree(m) => m.predict(x),
            Regressor::RandomForest(m) => m.predict(x),
        }
    }
}

// ============================================================================
// ESTIMATOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundledPipeline {
    pub preprocessor: ColumnTransformer,
    pub regressor: Regressor,
}

/// Loaded estimator artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimator {
    /// Preprocessing is part of the artifact.
    SelfContained(BundledPipeline),
    /// Needs a separately stored preprocessor.
    External(Regressor),
}

impl Estimator {
    /// Decode `best_model.json`; `"kind": "pipeline"` selects the bundled form.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("kind").and_then(Value::as_str) == Some("pipeline") {
            serde_json::from_value(value).map(Estimator::SelfContained)
        } else {
            serde_json::from_value(value).map(Estimator::External)
        }
    }

    pub fn needs_external_preprocessor(&self) -> bool {
        matches!(self, Estimator::External(_))
    }

    /// Single-row prediction. `external` is ignored for self-contained estimators.
    pub fn predict(
        &self,
        input: &ModelInput,
        external: Option<&ColumnTransformer>,
    ) -> Result<f64, EstimatorError> {
        let (preprocessor, regressor) = match self {
            Estimator::SelfContained(p) => (&p.preprocessor, &p.regressor),
            Estimator::External(r) => (external.ok_or(EstimatorError::MissingPreprocessor)?, r),
        };

        let row = preprocessor.transform(input)?;
        let y = regressor.predict(row.view())?;
        if y.is_finite() {
            Ok(y)
        } else {
            Err(EstimatorError::NonFinite)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn input(category: &str) -> ModelInput {
        ModelInput {
            reviews: 100.0,
            size_mb: 20.0,
            installs: 1000.0,
            price: 0.0,
            is_free: 1.0,
            category: category.to_string(),
        }
    }

    fn transformer() -> ColumnTransformer {
        ColumnTransformer {
            scaler: StandardScaler {
                mean: vec![0.0, 10.0, 0.0, 0.0, 0.0],
                scale: vec![100.0, 10.0, 1000.0, 1.0, 0.0],
            },
            encoder: OneHotEncoder {
                categories: vec!["GAME".to_string(), "TOOLS".to_string()],
            },
        }
    }

    /// Splits on the scaled size column (index 1) at 0.5.
    fn stump(low: f64, high: f64) -> DecisionTree {
        DecisionTree {
            n_features: 7,
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![1, -2, -2],
            threshold: vec![0.5, 0.0, 0.0],
            value: vec![0.0, low, high],
        }
    }

    #[test]
    fn test_transform_scales_and_encodes() {
        let row = transformer().transform(&input("TOOLS")).unwrap();
        assert_eq!(row, array![1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_encodes_as_zeros() {
        let row = transformer().transform(&input("WEATHER")).unwrap();
        assert_eq!(row.slice(ndarray::s![NUMERIC_COLUMNS..]).sum(), 0.0);
    }

    #[test]
    fn test_linear_prediction() {
        let model = LinearRegressor {
            intercept: 4.0,
            coefficients: vec![0.1, 0.0, 0.0, 0.0, 0.0, 0.0, -0.5],
        };
        let row = transformer().transform(&input("TOOLS")).unwrap();
        let y = model.predict(row.view()).unwrap();
        assert!((y - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_linear_width_mismatch() {
        let model = LinearRegressor { intercept: 4.0, coefficients: vec![1.0] };
        let err = model.predict(array![1.0, 2.0].view()).unwrap_err();
        assert!(matches!(err, EstimatorError::WidthMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn test_tree_and_forest() {
        let row = transformer().transform(&input("GAME")).unwrap();
        // scaled size = (20 - 10) / 10 = 1.0 > 0.5 -> right leaf
        assert_eq!(stump(3.0, 4.5).predict(row.view()).unwrap(), 4.5);

        let forest = RandomForest { trees: vec![stump(3.0, 4.0), stump(3.0, 5.0)] };
        assert_eq!(forest.predict(row.view()).unwrap(), 4.5);

        let empty = RandomForest { trees: vec![] };
        assert!(matches!(empty.predict(row.view()), Err(EstimatorError::EmptyForest)));
    }

    #[test]
    fn test_tree_cycle_is_malformed() {
        let tree = DecisionTree {
            n_features: 1,
            children_left: vec![0],
            children_right: vec![0],
            feature: vec![0],
            threshold: vec![0.0],
            value: vec![1.0],
        };
        assert!(matches!(tree.predict(array![1.0].view()), Err(EstimatorError::MalformedTree(_))));
    }

    #[test]
    fn test_estimator_decoding() {
        let bare = Estimator::from_value(json!({
            "kind": "linear", "intercept": 4.1, "coefficients": [0.0]
        }))
        .unwrap();
        assert!(bare.needs_external_preprocessor());

        let bundled = Estimator::from_value(json!({
            "kind": "pipeline",
            "preprocessor": {
                "scaler": {"mean": [0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1]},
                "encoder": {"categories": ["GAME"]}
            },
            "regressor": {"kind": "linear", "intercept": 4.0, "coefficients": [0, 0, 0, 0, 0, 0.25]}
        }))
        .unwrap();
        assert!(!bundled.needs_external_preprocessor());
        assert_eq!(bundled.predict(&input("game"), None).unwrap(), 4.25);

        assert!(Estimator::from_value(json!({"kind": "svm"})).is_err());
    }

    #[test]
    fn test_external_estimator_requires_preprocessor() {
        let est = Estimator::External(Regressor::Linear(LinearRegressor {
            intercept: 4.0,
            coefficients: vec![0.0; 7],
        }));
        assert!(matches!(
            est.predict(&input("GAME"), None),
            Err(EstimatorError::MissingPreprocessor)
        ));
        assert_eq!(est.predict(&input("GAME"), Some(&transformer())).unwrap(), 4.0);
    }

    #[test]
    fn test_check_columns() {
        let expected: Vec<String> = MODEL_INPUT_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert!(ModelInput::check_columns(&expected).is_ok());

        let mut reordered = expected.clone();
        reordered.swap(0, 1);
        assert!(ModelInput::check_columns(&reordered).is_err());
    }
}
