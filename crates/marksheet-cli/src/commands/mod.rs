//! Subcommands and the wiring they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod process;

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use tracing::{debug, warn};

use marksheet_core::error::{OcrError, PipelineError};
use marksheet_core::models::config::MarksheetConfig;
use marksheet_core::{CandidateFields, HttpFetcher, Pipeline, PureOcrEngine, TextRecognizer};

/// Output format for extraction results.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marksheet")
        .join("config.json")
}

/// Load the configuration file (if any) and overlay the environment.
pub fn load_config(path: Option<&str>) -> anyhow::Result<MarksheetConfig> {
    let mut config = match path {
        Some(path) => MarksheetConfig::from_file(Path::new(path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                MarksheetConfig::from_file(&default_path)?
            } else {
                MarksheetConfig::default()
            }
        }
    };

    config.apply_env();
    Ok(config)
}

/// Recognizer used when OCR models could not be loaded.
///
/// Text-layer PDFs still work; scans and images come out empty.
struct UnavailableRecognizer {
    reason: String,
}

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::ModelLoad(self.reason.clone()))
    }
}

/// Build the pipeline for this deployment.
pub fn build_pipeline(config: &MarksheetConfig) -> anyhow::Result<Pipeline> {
    let recognizer: Box<dyn TextRecognizer> = match PureOcrEngine::from_config(config.ocr.clone())
    {
        Ok(engine) => {
            debug!("Loaded OCR models from {}", config.ocr.model_dir.display());
            Box::new(engine)
        }
        Err(e) => {
            warn!("OCR unavailable, only PDF text layers can be read: {}", e);
            Box::new(UnavailableRecognizer {
                reason: e.to_string(),
            })
        }
    };

    let fetcher = HttpFetcher::new(&config.fetch)?;
    Ok(Pipeline::from_config(config, Box::new(fetcher), recognizer)?)
}

/// Spinner on stderr for long-running steps.
pub fn spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

/// Fields under the record's column names.
pub fn extracted_json(fields: &CandidateFields) -> Value {
    json!({
        "name": fields.name,
        "grade12": fields.grade_value,
        "ai_score": fields.suitability_score,
        "recommended_branch": fields.recommended_category,
    })
}

/// Error body for a failed run.
pub fn error_json(err: &PipelineError) -> Value {
    match err {
        PipelineError::InvalidRequest(message) => json!({ "error": message }),
        PipelineError::Fetch(source) => json!({
            "error": "failed to download file",
            "details": source.to_string(),
        }),
        PipelineError::EmptyText => json!({ "error": err.to_string() }),
        PipelineError::SinkUpdate { report, source } => json!({
            "error": "failed updating submission",
            "details": source.to_string(),
            "extracted": extracted_json(&report.fields),
        }),
    }
}

/// Plain text rendering of extracted fields.
pub fn format_fields(fields: &CandidateFields) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Name:               {}\n",
        fields.name.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Grade:              {}\n",
        fields
            .grade_value
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    output.push_str(&format!("Suitability score:  {}\n", fields.suitability_score));
    output.push_str(&format!("Recommended branch: {}\n", fields.recommended_category));

    output
}
