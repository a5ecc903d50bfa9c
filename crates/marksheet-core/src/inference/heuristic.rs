//! Deterministic pattern and entity based inference.

use async_trait::async_trait;
use tracing::debug;

use crate::models::config::{GradePick, InferenceConfig};
use crate::models::document::{RawFields, StrategyKind};

use super::rules::{pick_grade, EntityRecognizer, GradeRange, PersonNameRecognizer};
use super::FieldInferencer;

/// Heuristic inferencer: first person mention, best grade candidate.
///
/// Never derives a suitability score or category; the validator supplies
/// the defaults.
pub struct HeuristicInferencer {
    recognizer: Box<dyn EntityRecognizer>,
    range: GradeRange,
    pick: GradePick,
}

impl HeuristicInferencer {
    /// Create an inferencer with default rules.
    pub fn new() -> Self {
        Self {
            recognizer: Box::new(PersonNameRecognizer::new()),
            range: GradeRange::default(),
            pick: GradePick::Largest,
        }
    }

    /// Create an inferencer from configuration.
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new()
            .with_range(GradeRange::from(config))
            .with_pick(config.grade_pick)
    }

    /// Set the accepted grade range.
    pub fn with_range(mut self, range: GradeRange) -> Self {
        self.range = range;
        self
    }

    /// Set the grade selection rule.
    pub fn with_pick(mut self, pick: GradePick) -> Self {
        self.pick = pick;
        self
    }

    /// Use a different person recognizer.
    pub fn with_recognizer(mut self, recognizer: Box<dyn EntityRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    /// Synchronous form of [`FieldInferencer::infer`].
    pub fn infer_fields(&self, text: &str) -> RawFields {
        let mentions = self.recognizer.person_mentions(text);
        let grade_value = pick_grade(text, &self.range, self.pick);

        debug!(
            "Heuristic inference: {} person mentions, grade {:?}",
            mentions.len(),
            grade_value
        );

        RawFields {
            name: mentions.into_iter().next(),
            grade_value,
            suitability_score: None,
            recommended_category: None,
        }
    }
}

impl Default for HeuristicInferencer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FieldInferencer for HeuristicInferencer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Heuristic
    }

    async fn infer(&self, text: &str) -> RawFields {
        self.infer_fields(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scenario_sentence() {
        let fields = HeuristicInferencer::new().infer_fields("John Doe scored 88.5% Total: 88.5");
        assert_eq!(
            fields,
            RawFields {
                name: Some("John Doe".to_string()),
                grade_value: Some(88.5),
                suitability_score: None,
                recommended_category: None,
            }
        );
    }

    #[test]
    fn test_deterministic() {
        let text = "Name: Meera Iyer\nMathematics 95\nPhysics 91\nTotal: 472\n94.4%";
        let inferencer = HeuristicInferencer::new();
        let first = inferencer.infer_fields(text);
        let second = inferencer.infer_fields(text);
        assert_eq!(first, second);
        assert_eq!(first.name.as_deref(), Some("Meera Iyer"));
        assert_eq!(first.grade_value, Some(472.0));
    }

    #[test]
    fn test_configured_range_and_pick() {
        let config = InferenceConfig {
            max_grade: 100.0,
            ..InferenceConfig::default()
        };
        let fields = HeuristicInferencer::from_config(&config)
            .infer_fields("Total: 472 Percentage: 94.4%");
        assert_eq!(fields.grade_value, Some(94.4));
    }

    #[test]
    fn test_nothing_found_stays_absent() {
        let fields = HeuristicInferencer::new().infer_fields("illegible scan");
        assert_eq!(fields, RawFields::default());
    }

    #[tokio::test]
    async fn test_trait_dispatch() {
        let inferencer: Box<dyn FieldInferencer> = Box::new(HeuristicInferencer::new());
        assert_eq!(inferencer.kind(), StrategyKind::Heuristic);
        let fields = inferencer.infer("Asha Verma 81%").await;
        assert_eq!(fields.name.as_deref(), Some("Asha Verma"));
        assert_eq!(fields.grade_value, Some(81.0));
    }
}
