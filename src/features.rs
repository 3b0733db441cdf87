//! Feature Validator
//!
//! Checks an untrusted feature record against the type and range
//! constraints the model was trained under and normalizes it into the
//! canonical form consumed by the inference pipeline.
//!
//! Validation is fail-all: every violated field is reported in one error.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const MAX_REVIEWS: i64 = 100_000_000;
pub const MIN_SIZE_MB: f64 = 0.1;
pub const MAX_SIZE_MB: f64 = 500.0;
pub const MAX_INSTALLS: i64 = 10_000_000_000;
pub const MAX_PRICE: f64 = 400.0;

/// Wire names of the record fields, in reporting order.
pub const FEATURE_FIELDS: [&str; 6] = [
    "reviews",
    "size_mb",
    "installs",
    "price",
    "is_free",
    "category",
];

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Raw feature record as received on the wire.
///
/// Every field is optional and loosely typed so that missing fields and
/// type mismatches can be reported alongside range violations. The record
/// itself must still be a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawFeatures {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_mb: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Value>,
}

impl From<Map<String, Value>> for RawFeatures {
    fn from(mut map: Map<String, Value>) -> Self {
        Self {
            reviews: map.remove("reviews"),
            size_mb: map.remove("size_mb"),
            installs: map.remove("installs"),
            price: map.remove("price"),
            is_free: map.remove("is_free"),
            category: map.remove("category"),
        }
    }
}

// A derived impl would also accept a positional array.
impl<'de> Deserialize<'de> for RawFeatures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from)
    }
}

/// Canonical (validated) feature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppFeatures {
    pub reviews: u64,
    pub size_mb: f64,
    pub installs: u64,
    pub price: f64,
    pub is_free: u8,
    pub category: String,
}

impl From<&AppFeatures> for RawFeatures {
    fn from(features: &AppFeatures) -> Self {
        Self {
            reviews: Some(Value::from(features.reviews)),
            size_mb: Some(Value::from(features.size_mb)),
            installs: Some(Value::from(features.installs)),
            price: Some(Value::from(features.price)),
            is_free: Some(Value::from(features.is_free)),
            category: Some(Value::from(features.category.clone())),
        }
    }
}

/// Typed but not yet range-checked values. A field is `None` when it was
/// missing or had the wrong type; those cases are already recorded.
#[derive(Debug, Default, Validate)]
struct TypedFeatures {
    #[validate(range(min = 0, max = MAX_REVIEWS, message = "must be between 0 and 100000000"))]
    reviews: Option<i64>,
    #[validate(range(min = MIN_SIZE_MB, max = MAX_SIZE_MB, message = "must be between 0.1 and 500.0"))]
    size_mb: Option<f64>,
    #[validate(range(min = 0, max = MAX_INSTALLS, message = "must be between 0 and 10000000000"))]
    installs: Option<i64>,
    #[validate(range(min = 0.0, max = MAX_PRICE, message = "must be between 0.0 and 400.0"))]
    price: Option<f64>,
    #[validate(range(min = 0, max = 1, message = "must be 0 or 1"))]
    is_free: Option<i64>,
    #[validate(length(min = 1, message = "Category cannot be empty"))]
    category: Option<String>,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    InvalidType,
    OutOfRange,
    Empty,
}

/// A single field-level constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One or more fields failed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid feature record: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Names of the offending fields, in reporting order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn violation(&self, field: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate and normalize a raw feature record.
pub fn validate(raw: &RawFeatures) -> Result<AppFeatures, ValidationError> {
    let mut violations = Vec::new();

    let typed = TypedFeatures {
        reviews: integer_field("reviews", raw.reviews.as_ref(), &mut violations),
        size_mb: float_field("size_mb", raw.size_mb.as_ref(), &mut violations),
        installs: integer_field("installs", raw.installs.as_ref(), &mut violations),
        price: float_field("price", raw.price.as_ref(), &mut violations),
        is_free: integer_field("is_free", raw.is_free.as_ref(), &mut violations),
        category: category_field(raw.category.as_ref(), &mut violations),
    };

    if let Err(errors) = typed.validate() {
        for (field, errs) in errors.field_errors() {
            let name: &str = &field;
            let Some(field) = FEATURE_FIELDS.iter().copied().find(|f| *f == name) else {
                continue;
            };
            for err in errs.iter() {
                let kind = if err.code == "length" {
                    ViolationKind::Empty
                } else {
                    ViolationKind::OutOfRange
                };
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                violations.push(FieldViolation::new(field, kind, message));
            }
        }
    }

    if !violations.is_empty() {
        violations.sort_by_key(|v| field_position(v.field));
        return Err(ValidationError { violations });
    }

    // Every field is present and in range at this point.
    match typed {
        TypedFeatures {
            reviews: Some(reviews),
            size_mb: Some(size_mb),
            installs: Some(installs),
            price: Some(price),
            is_free: Some(is_free),
            category: Some(category),
        } => Ok(AppFeatures {
            reviews: reviews as u64,
            size_mb,
            installs: installs as u64,
            price,
            is_free: is_free as u8,
            category,
        }),
        _ => Err(ValidationError { violations }),
    }
}

fn field_position(field: &str) -> usize {
    FEATURE_FIELDS
        .iter()
        .position(|f| *f == field)
        .unwrap_or(FEATURE_FIELDS.len())
}

fn missing(field: &'static str) -> FieldViolation {
    FieldViolation::new(field, ViolationKind::Missing, "field required")
}

fn integer_field(
    field: &'static str,
    value: Option<&Value>,
    violations: &mut Vec<FieldViolation>,
) -> Option<i64> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        violations.push(missing(field));
        return None;
    };

    let Value::Number(number) = value else {
        violations.push(FieldViolation::new(field, ViolationKind::InvalidType, "must be an integer"));
        return None;
    };

    if let Some(i) = number.as_i64() {
        return Some(i);
    }

    // Larger than i64::MAX, or a float literal.
    if number.as_u64().is_some() {
        violations.push(FieldViolation::new(field, ViolationKind::OutOfRange, "value is too large"));
        return None;
    }

    let f = number.as_f64().unwrap_or(f64::NAN);
    if !f.is_finite() || f.fract() != 0.0 {
        violations.push(FieldViolation::new(field, ViolationKind::InvalidType, "must be an integer"));
        return None;
    }
    if f.abs() >= i64::MAX as f64 {
        violations.push(FieldViolation::new(field, ViolationKind::OutOfRange, "value is too large"));
        return None;
    }
    Some(f as i64)
}

fn float_field(
    field: &'static str,
    value: Option<&Value>,
    violations: &mut Vec<FieldViolation>,
) -> Option<f64> {
    match value.filter(|v| !v.is_null()) {
        None => {
            violations.push(missing(field));
            None
        }
        Some(Value::Number(number)) => match number.as_f64() {
            Some(f) if f.is_finite() => Some(f),
            _ => {
                violations.push(FieldViolation::new(field, ViolationKind::InvalidType, "must be a finite number"));
                None
            }
        },
        Some(_) => {
            violations.push(FieldViolation::new(field, ViolationKind::InvalidType, "must be a number"));
            None
        }
    }
}

fn category_field(value: Option<&Value>, violations: &mut Vec<FieldViolation>) -> Option<String> {
    match value.filter(|v| !v.is_null()) {
        None => {
            violations.push(missing("category"));
            None
        }
        Some(Value::String(s)) => Some(normalize_category(s)),
        Some(_) => {
            violations.push(FieldViolation::new("category", ViolationKind::InvalidType, "must be a string"));
            None
        }
    }
}

/// Trimmed, upper-cased category.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_uppercase()
}
