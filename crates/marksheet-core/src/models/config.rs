//! Configuration structures for the marksheet pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::models::document::StrategyKind;

/// Main configuration for the marksheet pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarksheetConfig {
    /// Byte fetcher configuration.
    pub fetch: FetchConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Field inference configuration.
    pub inference: InferenceConfig,

    /// Record store configuration.
    pub store: StoreConfig,
}

/// Byte fetcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent sent with downloads.
    pub user_agent: String,

    /// Largest document accepted, in bytes.
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: concat!("marksheet/", env!("CARGO_PKG_VERSION")).to_string(),
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering the first page when the text layer is empty.
    pub render_dpi: u32,

    /// Pixel budget for a rendered page; larger pages are scaled down.
    pub max_render_pixels: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            max_render_pixels: 40_000_000,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognised text.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// How the heuristic strategy picks a grade among candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradePick {
    /// The largest in-range value.
    #[default]
    Largest,
    /// The first in-range value in document order.
    FirstSeen,
}

/// Field inference configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Strategy used for every document in this deployment.
    pub strategy: StrategyKind,

    /// Smallest numeric value accepted as a grade candidate.
    pub min_grade: f64,

    /// Largest numeric value accepted as a grade candidate.
    pub max_grade: f64,

    /// Grade selection rule.
    pub grade_pick: GradePick,

    /// Suitability score used when none was determined.
    pub default_suitability_score: f64,

    /// Category used when none was determined.
    pub default_category: String,

    /// Completion model name.
    pub model: String,

    /// Base URL of the completion API.
    pub api_base: String,

    /// API key for the completion service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Completion request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Heuristic,
            min_grade: 0.0,
            max_grade: 1000.0,
            grade_pick: GradePick::Largest,
            default_suitability_score: 70.0,
            default_category: "General Engineering".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the record store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Service credential sent as `apikey` and bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_role_key: Option<String>,

    /// Table holding submissions.
    pub table: String,

    /// Status written alongside extracted fields.
    pub verified_status: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_role_key: None,
            table: "submissions".to_string(),
            verified_status: "Verified".to_string(),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Check the store can be reached with the configured credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(ConfigError::Missing("store.url (SUPABASE_URL)".to_string()));
        }
        if self
            .service_role_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Missing(
                "store.service_role_key (SUPABASE_SERVICE_ROLE_KEY)".to_string(),
            ));
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "store.table".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl MarksheetConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Overlay values from a variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.store.url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(key) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.store.service_role_key = Some(key);
        }
        if let Some(table) = get("SUPABASE_TABLE") {
            self.store.table = table;
        }
        if let Some(key) = get("GOOGLE_API_KEY") {
            self.inference.api_key = Some(key);
        }
        if let Some(strategy) = get("MARKSHEET_STRATEGY") {
            match strategy.to_ascii_lowercase().as_str() {
                "heuristic" => self.inference.strategy = StrategyKind::Heuristic,
                "model" => self.inference.strategy = StrategyKind::Model,
                other => tracing::warn!("Ignoring unknown MARKSHEET_STRATEGY '{}'", other),
            }
        }
        if let Some(dir) = get("MARKSHEET_MODEL_DIR") {
            self.ocr.model_dir = PathBuf::from(dir);
        }
    }

    /// Validate settings needed by the extraction pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inference = &self.inference;

        if !inference.min_grade.is_finite() || !inference.max_grade.is_finite() {
            return Err(ConfigError::Invalid {
                key: "inference.min_grade/max_grade".to_string(),
                reason: "must be finite".to_string(),
            });
        }
        if inference.min_grade > inference.max_grade {
            return Err(ConfigError::Invalid {
                key: "inference.min_grade".to_string(),
                reason: format!(
                    "{} is greater than max_grade {}",
                    inference.min_grade, inference.max_grade
                ),
            });
        }
        if !(0.0..=100.0).contains(&inference.default_suitability_score) {
            return Err(ConfigError::Invalid {
                key: "inference.default_suitability_score".to_string(),
                reason: "must be within 0-100".to_string(),
            });
        }
        if inference.default_category.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "inference.default_category".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if inference.strategy == StrategyKind::Model
            && inference.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Missing(
                "inference.api_key (GOOGLE_API_KEY) for the model strategy".to_string(),
            ));
        }
        if self.pdf.render_dpi == 0 {
            return Err(ConfigError::Invalid {
                key: "pdf.render_dpi".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.pdf.max_render_pixels == 0 {
            return Err(ConfigError::Invalid {
                key: "pdf.max_render_pixels".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.fetch.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch.max_bytes".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_validate() {
        let config = MarksheetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pdf.render_dpi, 300);
        assert_eq!(config.inference.default_suitability_score, 70.0);
        assert_eq!(config.inference.default_category, "General Engineering");
        assert_eq!(config.store.table, "submissions");
    }

    #[test]
    fn test_apply_vars() {
        let env = vars(&[
            ("SUPABASE_URL", "https://db.example.co/"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ("SUPABASE_TABLE", ""),
            ("GOOGLE_API_KEY", "g-key"),
            ("MARKSHEET_STRATEGY", "model"),
        ]);

        let mut config = MarksheetConfig::default();
        config.apply_vars(|k| env.get(k).cloned());

        assert_eq!(config.store.url.as_deref(), Some("https://db.example.co"));
        assert_eq!(config.store.service_role_key.as_deref(), Some("secret"));
        assert_eq!(config.store.table, "submissions");
        assert_eq!(config.inference.strategy, StrategyKind::Model);
        assert!(config.validate().is_ok());
        assert!(config.store.validate().is_ok());
    }

    #[test]
    fn test_model_strategy_requires_key() {
        let mut config = MarksheetConfig::default();
        config.inference.strategy = StrategyKind::Model;
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_inverted_grade_range_rejected() {
        let mut config = MarksheetConfig::default();
        config.inference.min_grade = 10.0;
        config.inference.max_grade = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = MarksheetConfig::default();
        config.fetch.max_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = MarksheetConfig::default();
        config.pdf.max_render_pixels = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_store_requires_credentials() {
        let config = StoreConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MarksheetConfig =
            serde_json::from_str(r#"{"inference": {"strategy": "model", "max_grade": 100}}"#)
                .unwrap();
        assert_eq!(config.inference.strategy, StrategyKind::Model);
        assert_eq!(config.inference.max_grade, 100.0);
        assert_eq!(config.inference.min_grade, 0.0);
        assert_eq!(config.pdf.render_dpi, 300);
    }
}
