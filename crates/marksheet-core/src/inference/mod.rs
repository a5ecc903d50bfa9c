//! Field inference: plain text to raw candidate fields.
//!
//! Two strategies implement [`FieldInferencer`]:
//! - [`HeuristicInferencer`]: deterministic patterns and person-entity rules
//! - [`ModelInferencer`]: a structured-extraction service
//!
//! One strategy is selected per deployment via [`InferenceConfig::strategy`].

pub mod client;
pub mod heuristic;
pub mod model;
pub mod rules;

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::models::config::InferenceConfig;
use crate::models::document::{RawFields, StrategyKind};

pub use client::{CompletionClient, GeminiClient};
pub use heuristic::HeuristicInferencer;
pub use model::ModelInferencer;

/// Derives raw fields from extracted text.
///
/// Implementations never fail: anything they cannot determine is left
/// absent for the validator to fill.
#[async_trait]
pub trait FieldInferencer: Send + Sync {
    /// Strategy implemented.
    fn kind(&self) -> StrategyKind;

    /// Infer fields from non-empty text.
    async fn infer(&self, text: &str) -> RawFields;
}

/// Build the configured strategy.
pub fn build_inferencer(config: &InferenceConfig) -> Result<Box<dyn FieldInferencer>, ConfigError> {
    match config.strategy {
        StrategyKind::Heuristic => Ok(Box::new(HeuristicInferencer::from_config(config))),
        StrategyKind::Model => {
            let client = GeminiClient::from_config(config)
                .map_err(|e| ConfigError::Missing(e.to_string()))?;
            Ok(Box::new(ModelInferencer::new(Box::new(client))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_heuristic_by_default() {
        let inferencer = build_inferencer(&InferenceConfig::default()).unwrap();
        assert_eq!(inferencer.kind(), StrategyKind::Heuristic);
    }

    #[test]
    fn test_build_model_requires_key() {
        let mut config = InferenceConfig {
            strategy: StrategyKind::Model,
            ..InferenceConfig::default()
        };
        assert!(build_inferencer(&config).is_err());

        config.api_key = Some("test-key".to_string());
        let inferencer = build_inferencer(&config).unwrap();
        assert_eq!(inferencer.kind(), StrategyKind::Model);
    }
}
