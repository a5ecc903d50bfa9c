//! Core library for marksheet processing.
//!
//! This crate provides:
//! - Byte fetching with content-type hints
//! - Text extraction (PDF text layer, OCR fallback for scans and images)
//! - Candidate field inference (heuristic rules or a completion service)
//! - Result validation with configurable defaults
//! - A record store client for writing extracted fields back

pub mod error;
pub mod extract;
pub mod fetch;
pub mod inference;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod store;
pub mod validate;

pub use error::{MarksheetError, PipelineError, Result};
pub use extract::TextExtractor;
pub use fetch::{ByteSource, HttpFetcher};
pub use inference::{FieldInferencer, HeuristicInferencer, ModelInferencer, build_inferencer};
pub use models::config::MarksheetConfig;
pub use models::document::{
    CandidateFields, DocumentRef, ExtractedText, ExtractionAttempt, ExtractionReport,
    FormatHint, RawDocument, RawFields, StrategyKind, TextSource,
};
pub use ocr::TextRecognizer;
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfExtractor, PdfProcessor};
pub use pipeline::Pipeline;
pub use store::{RecordStore, SupabaseStore, UpdatePayload};
pub use validate::ResultValidator;
