//! Result validation: fill defaults and normalise raw fields.
//!
//! This is the only place defaults live. Strategies leave unknown fields
//! absent; the validator decides what the record finally says.

use tracing::{debug, warn};

use crate::models::config::InferenceConfig;
use crate::models::document::{CandidateFields, RawFields};

/// Default suitability score.
pub const DEFAULT_SUITABILITY_SCORE: f64 = 70.0;

/// Default recommended category.
pub const DEFAULT_CATEGORY: &str = "General Engineering";

/// Validated fields plus what had to be filled or left out.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub fields: CandidateFields,
    /// Fields filled with a default.
    pub defaulted: Vec<String>,
    /// Fields left absent.
    pub missing: Vec<String>,
}

/// Fills the always-present fields and cleans the optional ones.
#[derive(Debug, Clone)]
pub struct ResultValidator {
    default_score: f64,
    default_category: String,
}

impl ResultValidator {
    pub fn new(default_score: f64, default_category: impl Into<String>) -> Self {
        Self {
            default_score,
            default_category: default_category.into(),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(
            config.default_suitability_score,
            config.default_category.clone(),
        )
    }

    /// Normalise raw strategy output.
    ///
    /// A present score passes through unchanged (out-of-range values are
    /// logged); a missing or non-finite one becomes the default. A missing or blank category becomes the default.
    /// Name and grade are passed through, never fabricated.
    pub fn normalize(&self, raw: RawFields) -> Normalized {
        let mut defaulted = Vec::new();
        let mut missing = Vec::new();

        let suitability_score = match raw.suitability_score.filter(|s| s.is_finite()) {
            Some(score) => {
                if !(0.0..=100.0).contains(&score) {
                    warn!("Suitability score {} is outside 0-100, keeping it", score);
                }
                score
            }
            None => {
                defaulted.push("suitability_score".to_string());
                self.default_score
            }
        };

        let recommended_category = match raw
            .recommended_category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
        {
            Some(category) => category,
            None => {
                defaulted.push("recommended_category".to_string());
                self.default_category.clone()
            }
        };

        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if name.is_none() {
            missing.push("name".to_string());
        }

        let grade_value = raw.grade_value.filter(|g| g.is_finite());
        if grade_value.is_none() {
            missing.push("grade_value".to_string());
        }

        if !defaulted.is_empty() {
            debug!("Defaulted fields: {}", defaulted.join(", "));
        }

        Normalized {
            fields: CandidateFields {
                name,
                grade_value,
                suitability_score,
                recommended_category,
            },
            defaulted,
            missing,
        }
    }
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::new(DEFAULT_SUITABILITY_SCORE, DEFAULT_CATEGORY)
    }
}
