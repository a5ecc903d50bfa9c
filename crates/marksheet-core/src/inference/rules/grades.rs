//! Numeric grade candidates.
//!
//! Best effort: the grade guess is whichever in-range number the pick rule
//! selects. Nothing checks that it is actually the candidate's grade.

use crate::models::config::{GradePick, InferenceConfig};

use super::patterns::NUMERIC_TOKEN;

/// Inclusive bounds for plausible grade values.
///
/// The default `[0, 1000]` admits both percentages and raw mark totals
/// while rejecting phone numbers, roll numbers and years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeRange {
    pub min: f64,
    pub max: f64,
}

impl GradeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for GradeRange {
    fn default() -> Self {
        Self::new(0.0, 1000.0)
    }
}

impl From<&InferenceConfig> for GradeRange {
    fn from(config: &InferenceConfig) -> Self {
        Self::new(config.min_grade, config.max_grade)
    }
}

/// Every numeric token in document order, all capture groups flattened.
pub fn numeric_tokens(text: &str) -> Vec<f64> {
    NUMERIC_TOKEN
        .captures_iter(text)
        .flat_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// In-range values, deduplicated and sorted descending.
pub fn extract_grade_candidates(text: &str, range: &GradeRange) -> Vec<f64> {
    let mut values: Vec<f64> = numeric_tokens(text)
        .into_iter()
        .filter(|v| range.contains(*v))
        .collect();

    values.sort_by(|a, b| b.total_cmp(a));
    values.dedup();
    values
}

/// Select the grade guess.
pub fn pick_grade(text: &str, range: &GradeRange, pick: GradePick) -> Option<f64> {
    match pick {
        GradePick::Largest => extract_grade_candidates(text, range).first().copied(),
        GradePick::FirstSeen => numeric_tokens(text).into_iter().find(|v| range.contains(*v)),
    }
}
