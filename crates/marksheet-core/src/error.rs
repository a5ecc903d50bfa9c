//! Error types for the marksheet-core library.
//!
//! Stage errors (`PdfError`, `OcrError`, `InferenceError`) are caught at
//! their stage boundary and turned into empty or degraded data. Only
//! [`PipelineError`] reaches the invocation boundary.

use thiserror::Error;

use crate::models::document::ExtractionReport;

/// Main error type for the marksheet library.
#[derive(Error, Debug)]
pub enum MarksheetError {
    /// Byte source error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field inference error.
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while retrieving document bytes.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The document reference is not a usable URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network, DNS, TLS, or timeout failure.
    #[error("request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The byte source answered with a non-success status.
    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The document is larger than the configured limit.
    #[error("'{url}' exceeds the {limit}-byte download limit")]
    TooLarge { url: String, limit: u64 },

    /// The response body could not be read to completion.
    #[error("failed reading body of '{url}': {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract or decode page images.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection or recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised by the model-based field inferencer.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// No API key was configured for the completion service.
    #[error("completion service is not configured: {0}")]
    NotConfigured(String),

    /// The completion request failed before a response arrived.
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The completion service answered with an error.
    #[error("completion service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The service answered but carried no text.
    #[error("completion response contained no text")]
    EmptyResponse,

    /// The response text was not valid JSON.
    #[error("malformed JSON in completion: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The response parsed, but not as a JSON object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),
}

/// Errors raised while writing results to the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The record store is not configured.
    #[error("record store is not configured: {0}")]
    NotConfigured(String),

    /// Network or transport failure.
    #[error("record store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The record store rejected the update.
    #[error("record store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required value is missing.
    #[error("missing required setting: {0}")]
    Missing(String),

    /// A value is present but invalid.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Errors surfaced by a pipeline run to its caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document reference is incomplete; no work was done.
    #[error("{0}")]
    InvalidRequest(String),

    /// The document could not be retrieved.
    #[error("failed to download file: {0}")]
    Fetch(#[from] FetchError),

    /// Neither the text layer nor OCR produced any text.
    #[error("No text found in document")]
    EmptyText,

    /// Extraction succeeded but the record store update failed.
    ///
    /// The report is carried so callers still see what was extracted.
    #[error("failed updating submission: {source}")]
    SinkUpdate {
        report: Box<ExtractionReport>,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    /// The extraction report, when extraction completed before the failure.
    pub fn report(&self) -> Option<&ExtractionReport> {
        match self {
            PipelineError::SinkUpdate { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Result type for the marksheet library.
pub type Result<T> = std::result::Result<T, MarksheetError>;
