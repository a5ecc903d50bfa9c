//! Values that flow through one pipeline run.
//!
//! Nothing here is mutated after creation and nothing is shared between
//! runs: a [`RawDocument`] becomes an [`ExtractedText`], which becomes a
//! [`RawFields`], which the validator turns into [`CandidateFields`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to the document a caller wants processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Identifier of the submission record to update.
    #[serde(default)]
    pub submission_id: String,
    /// Location of the uploaded marksheet.
    #[serde(default)]
    pub file_url: String,
}

impl DocumentRef {
    pub fn new(submission_id: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            file_url: file_url.into(),
        }
    }

    /// Reject references missing either field.
    pub fn validate(&self) -> Result<(), String> {
        if self.submission_id.trim().is_empty() || self.file_url.trim().is_empty() {
            return Err("submission_id and file_url required".to_string());
        }
        Ok(())
    }
}

/// Declared format of a document: the content type and/or file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatHint {
    /// Content-Type header value, if any.
    pub content_type: Option<String>,
    /// File name or URL the bytes came from, if any.
    pub file_name: Option<String>,
}

impl FormatHint {
    pub fn new(content_type: Option<String>, file_name: Option<String>) -> Self {
        Self {
            content_type,
            file_name,
        }
    }

    /// Hint from a content type only.
    pub fn content_type(content_type: impl Into<String>) -> Self {
        Self::new(Some(content_type.into()), None)
    }

    /// Hint from a file name or URL only.
    pub fn file_name(file_name: impl Into<String>) -> Self {
        Self::new(None, Some(file_name.into()))
    }

    /// Whether the hint declares a PDF.
    ///
    /// True when the content type mentions `pdf` or the name ends in `.pdf`
    /// (query string and fragment ignored).
    pub fn is_pdf(&self) -> bool {
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"));

        let by_name = self.file_name.as_deref().is_some_and(|name| {
            let path = name.split(['?', '#']).next().unwrap_or(name);
            path.to_ascii_lowercase().ends_with(".pdf")
        });

        by_type || by_name
    }
}

/// Raw bytes of one uploaded document.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    format_hint: FormatHint,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, format_hint: FormatHint) -> Self {
        Self { bytes, format_hint }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format_hint(&self) -> &FormatHint {
        &self.format_hint
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Which strategy produced a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Text embedded in the PDF structure.
    TextLayer,
    /// Text recognised from a raster image.
    OpticalRecognition,
}

/// Plain text pulled out of a document.
///
/// Empty content is a valid terminal value; callers decide whether it is
/// a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub content: String,
    pub source_strategy: TextSource,
}

impl ExtractedText {
    pub fn new(content: impl Into<String>, source_strategy: TextSource) -> Self {
        Self {
            content: content.into(),
            source_strategy,
        }
    }

    /// Empty result from the given strategy.
    pub fn empty(source_strategy: TextSource) -> Self {
        Self::new(String::new(), source_strategy)
    }

    /// True when there is no non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Field-inference strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Deterministic pattern and entity rules.
    #[default]
    Heuristic,
    /// External structured-extraction service.
    Model,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Heuristic => write!(f, "heuristic"),
            StrategyKind::Model => write!(f, "model"),
        }
    }
}

/// Strategy output before default filling. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFields {
    pub name: Option<String>,
    pub grade_value: Option<f64>,
    pub suitability_score: Option<f64>,
    pub recommended_category: Option<String>,
}

/// Structured fields derived from a marksheet.
///
/// `suitability_score` and `recommended_category` are always present.
/// `name` and `grade_value` stay absent when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFields {
    pub name: Option<String>,
    pub grade_value: Option<f64>,
    pub suitability_score: f64,
    pub recommended_category: String,
}

/// Record of the path a run took, for tracing degraded results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    /// Field-inference strategy used.
    pub strategy: StrategyKind,

    /// Strategy that produced the text.
    pub text_source: TextSource,

    /// Fields filled with defaults by the validator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaulted_fields: Vec<String>,

    /// Fields left unknown.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractionAttempt {
    /// Whether any field came from a default rather than the document.
    pub fn is_degraded(&self) -> bool {
        !self.defaulted_fields.is_empty() || !self.missing_fields.is_empty()
    }
}

/// Outcome of one successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub submission_id: String,
    pub fields: CandidateFields,
    pub attempt: ExtractionAttempt,
    pub processed_at: DateTime<Utc>,
}
