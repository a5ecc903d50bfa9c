//! Model-based inference through a structured-extraction service.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::models::document::{RawFields, StrategyKind};

use super::FieldInferencer;
use super::client::CompletionClient;
use super::rules::patterns::CODE_FENCE;

/// Instructions sent ahead of the document text.
const PROMPT_HEADER: &str = "\
You process college admission documents. Read the marksheet text below and \
reply with exactly one JSON object with these keys:
- \"name\": the candidate's full name as a string, or null if absent.
- \"grade12\": the final 12th grade percentage or CGPA as a number, or null if absent.
- \"ai_score\": a number from 0 to 100 rating the candidate's suitability.
- \"recommended_branch\": the best-suited engineering branch as a string \
(for example \"Computer Science\", \"Mechanical\", or \"Not applicable\").";

/// Model-based inferencer.
///
/// Any failure (service error, malformed or non-object JSON) yields an
/// all-absent [`RawFields`]; the validator then fills the defaults.
pub struct ModelInferencer {
    client: Box<dyn CompletionClient>,
}

impl ModelInferencer {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self { client }
    }

    async fn try_infer(&self, text: &str) -> Result<RawFields, InferenceError> {
        let response = self.client.complete(&build_prompt(text)).await?;
        debug!("Completion response: {} chars", response.len());
        parse_completion(&response)
    }
}

#[async_trait]
impl FieldInferencer for ModelInferencer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Model
    }

    async fn infer(&self, text: &str) -> RawFields {
        match self.try_infer(text).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Model inference failed, using defaults: {}", e);
                RawFields::default()
            }
        }
    }
}

/// Compose the single request sent to the service.
pub fn build_prompt(text: &str) -> String {
    format!(
        "{}\n\nDocument text:\n---\n{}\n---\n\nReturn ONLY the JSON object.",
        PROMPT_HEADER,
        text.trim()
    )
}

/// Remove a surrounding code fence (with optional language tag), whether or
/// not the fences sit on their own lines.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(fence) = CODE_FENCE.find(text) {
        text = &text[fence.end()..];
    }
    if let Some(inner) = text.trim_end().strip_suffix("```") {
        text = inner;
    }

    text.trim()
}

/// Parse the service's reply into raw fields.
pub fn parse_completion(raw: &str) -> Result<RawFields, InferenceError> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))?;

    let Value::Object(object) = value else {
        return Err(InferenceError::NotAnObject(json_kind(&value).to_string()));
    };

    Ok(RawFields {
        name: string_field(&object, "name"),
        grade_value: number_field(&object, "grade12"),
        suitability_score: number_field(&object, "ai_score"),
        recommended_category: string_field(&object, "recommended_branch"),
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Numbers, or strings such as `"88.5%"` that hold one.
fn number_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    let value: Option<f64> = match object.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
