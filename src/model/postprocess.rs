//! Post-processing of raw regressor output.
//!
//! Ratings are clipped to the 1-5 star scale, classified, then rounded.
//! Classification always sees the clipped, unrounded value.

use serde::{Deserialize, Serialize};

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// Coarse confidence bucket for a predicted rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Classify a clipped rating.
    ///
    /// high: [3.5, 4.5], medium: [3.0, 3.5) and (4.5, 5.0], low: [1.0, 3.0)
    pub fn classify(rating: f64) -> Self {
        if (3.5..=4.5).contains(&rating) {
            Confidence::High
        } else if (3.0..3.5).contains(&rating) || (rating > 4.5 && rating <= MAX_RATING) {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

pub fn clip_rating(raw: f64) -> f64 {
    raw.clamp(MIN_RATING, MAX_RATING)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clip, classify, round - in that order.
pub fn finalize(raw: f64) -> (f64, Confidence) {
    let clipped = clip_rating(raw);
    let confidence = Confidence::classify(clipped);
    (round2(clipped), confidence)
}
