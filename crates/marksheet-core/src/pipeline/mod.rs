//! Extraction pipeline: fetch, extract text, infer, validate.
//!
//! Each run owns its values; nothing is shared between runs except the
//! read-only stage implementations.

use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ConfigError, PipelineError};
use crate::extract::TextExtractor;
use crate::fetch::ByteSource;
use crate::inference::{FieldInferencer, build_inferencer};
use crate::models::config::MarksheetConfig;
use crate::models::document::{
    CandidateFields, DocumentRef, ExtractionAttempt, ExtractionReport, RawDocument,
};
use crate::ocr::TextRecognizer;
use crate::store::{RecordStore, UpdatePayload};
use crate::validate::ResultValidator;

/// Ties the stages together for one deployment.
pub struct Pipeline {
    fetcher: Box<dyn ByteSource>,
    extractor: TextExtractor,
    inferencer: Box<dyn FieldInferencer>,
    validator: ResultValidator,
}

impl Pipeline {
    pub fn new(
        fetcher: Box<dyn ByteSource>,
        extractor: TextExtractor,
        inferencer: Box<dyn FieldInferencer>,
        validator: ResultValidator,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            inferencer,
            validator,
        }
    }

    /// Build a pipeline with the configured strategy and defaults.
    pub fn from_config(
        config: &MarksheetConfig,
        fetcher: Box<dyn ByteSource>,
        recognizer: Box<dyn TextRecognizer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self::new(
            fetcher,
            TextExtractor::new(recognizer, config.pdf.clone()),
            build_inferencer(&config.inference)?,
            ResultValidator::from_config(&config.inference),
        ))
    }

    /// Extract fields from bytes already in hand.
    pub async fn extract_fields(
        &self,
        document: &RawDocument,
    ) -> Result<(CandidateFields, ExtractionAttempt), PipelineError> {
        let start = Instant::now();

        let text = self.extractor.extract(document);
        if text.is_empty() {
            warn!("No text extracted, skipping inference");
            return Err(PipelineError::EmptyText);
        }

        let raw = self.inferencer.infer(&text.content).await;
        let normalized = self.validator.normalize(raw);

        let attempt = ExtractionAttempt {
            strategy: self.inferencer.kind(),
            text_source: text.source_strategy,
            defaulted_fields: normalized.defaulted,
            missing_fields: normalized.missing,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        if attempt.is_degraded() {
            info!(
                "Degraded extraction: defaulted [{}], missing [{}]",
                attempt.defaulted_fields.join(", "),
                attempt.missing_fields.join(", ")
            );
        }

        Ok((normalized.fields, attempt))
    }

    /// Run the full pipeline for one submission.
    pub async fn run(&self, request: &DocumentRef) -> Result<ExtractionReport, PipelineError> {
        request.validate().map_err(PipelineError::InvalidRequest)?;

        info!("Processing submission {}", request.submission_id);

        let document = self.fetcher.fetch(&request.file_url).await?;
        let (fields, attempt) = self.extract_fields(&document).await?;

        info!(
            "Submission {} extracted via {} in {}ms",
            request.submission_id, attempt.strategy, attempt.processing_time_ms
        );

        Ok(ExtractionReport {
            submission_id: request.submission_id.clone(),
            fields,
            attempt,
            processed_at: Utc::now(),
        })
    }

    /// Run the pipeline, then write the fields to the record store.
    ///
    /// Returns the report and the store's representation of the record.
    pub async fn run_and_store(
        &self,
        request: &DocumentRef,
        store: &dyn RecordStore,
        status: &str,
    ) -> Result<(ExtractionReport, Value), PipelineError> {
        let report = self.run(request).await?;
        let payload = UpdatePayload::from_fields(status, &report.fields);

        match store.update(&report.submission_id, &payload).await {
            Ok(updated) => Ok((report, updated)),
            Err(source) => {
                warn!(
                    "Store update for {} failed: {}",
                    report.submission_id, source
                );
                Err(PipelineError::SinkUpdate {
                    report: Box::new(report),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, OcrError, StoreError};
    use crate::inference::HeuristicInferencer;
    use crate::models::config::PdfConfig;
    use crate::models::document::{FormatHint, RawFields, StrategyKind, TextSource};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    /// Serves fixed bytes and counts requests.
    struct StubSource {
        document: Option<(Vec<u8>, FormatHint)>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ByteSource for StubSource {
        async fn fetch(&self, url: &str) -> crate::fetch::Result<RawDocument> {
            self.requests.lock().unwrap().push(url.to_string());
            match &self.document {
                Some((bytes, hint)) => Ok(RawDocument::new(bytes.clone(), hint.clone())),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    struct FixedRecognizer(&'static str);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    /// Returns canned fields and counts calls.
    struct CountingInferencer {
        calls: Arc<Mutex<u32>>,
        fields: RawFields,
    }

    #[async_trait]
    impl FieldInferencer for CountingInferencer {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Model
        }

        async fn infer(&self, _text: &str) -> RawFields {
            *self.calls.lock().unwrap() += 1;
            self.fields.clone()
        }
    }

    /// Accepts or rejects every update, keeping the payloads.
    struct StubStore {
        fail: bool,
        updates: Mutex<Vec<(String, UpdatePayload)>>,
    }

    #[async_trait]
    impl RecordStore for StubStore {
        async fn update(
            &self,
            submission_id: &str,
            payload: &UpdatePayload,
        ) -> Result<Value, StoreError> {
            self.updates
                .lock()
                .unwrap()
                .push((submission_id.to_string(), payload.clone()));
            if self.fail {
                Err(StoreError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(json!([{ "id": submission_id, "status": payload.status }]))
            }
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255])))
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    fn source(
        document: Option<(Vec<u8>, FormatHint)>,
    ) -> (Box<dyn ByteSource>, Arc<Mutex<Vec<String>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let source = StubSource {
            document,
            requests: requests.clone(),
        };
        (Box::new(source), requests)
    }

    fn heuristic_pipeline(fetcher: Box<dyn ByteSource>, ocr_text: &'static str) -> Pipeline {
        Pipeline::new(
            fetcher,
            TextExtractor::new(Box::new(FixedRecognizer(ocr_text)), PdfConfig::default()),
            Box::new(HeuristicInferencer::new()),
            ResultValidator::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_bytes_never_reach_inference() {
        let calls = Arc::new(Mutex::new(0));
        let pipeline = Pipeline::new(
            source(None).0,
            TextExtractor::new(Box::new(FixedRecognizer("unused")), PdfConfig::default()),
            Box::new(CountingInferencer {
                calls: calls.clone(),
                fields: RawFields::default(),
            }),
            ResultValidator::default(),
        );

        let document = RawDocument::new(Vec::new(), FormatHint::content_type("image/png"));
        let result = pipeline.extract_fields(&document).await;

        assert!(matches!(result, Err(PipelineError::EmptyText)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_ocr_text_is_empty_text() {
        let (fetcher, _) = source(Some((png_bytes(), FormatHint::content_type("image/png"))));
        let pipeline = heuristic_pipeline(fetcher, "  \n ");

        let result = pipeline
            .run(&DocumentRef::new("7", "https://files.example/m.png"))
            .await;
        assert!(matches!(result, Err(PipelineError::EmptyText)));
    }

    #[tokio::test]
    async fn test_heuristic_end_to_end() {
        let (fetcher, requests) =
            source(Some((png_bytes(), FormatHint::file_name("marksheet.png"))));
        let pipeline = heuristic_pipeline(fetcher, "John Doe scored 88.5% Total: 88.5");

        let report = pipeline
            .run(&DocumentRef::new("42", "https://files.example/marksheet.png"))
            .await
            .unwrap();

        assert_eq!(report.submission_id, "42");
        assert_eq!(
            report.fields,
            CandidateFields {
                name: Some("John Doe".to_string()),
                grade_value: Some(88.5),
                suitability_score: 70.0,
                recommended_category: "General Engineering".to_string(),
            }
        );
        assert_eq!(report.attempt.strategy, StrategyKind::Heuristic);
        assert_eq!(report.attempt.text_source, TextSource::OpticalRecognition);
        assert_eq!(
            report.attempt.defaulted_fields,
            vec!["suitability_score", "recommended_category"]
        );
        assert!(report.attempt.missing_fields.is_empty());
        assert_eq!(
            *requests.lock().unwrap(),
            vec!["https://files.example/marksheet.png"]
        );
    }

    #[tokio::test]
    async fn test_model_fields_flow_through() {
        let (fetcher, _) = source(Some((png_bytes(), FormatHint::content_type("image/png"))));
        let pipeline = Pipeline::new(
            fetcher,
            TextExtractor::new(Box::new(FixedRecognizer("Name: A")), PdfConfig::default()),
            Box::new(CountingInferencer {
                calls: Arc::new(Mutex::new(0)),
                fields: RawFields {
                    name: Some("A".into()),
                    grade_value: Some(90.0),
                    suitability_score: Some(95.0),
                    recommended_category: Some("CS".into()),
                },
            }),
            ResultValidator::default(),
        );

        let report = pipeline
            .run(&DocumentRef::new("1", "https://files.example/a.png"))
            .await
            .unwrap();
        assert_eq!(report.fields.suitability_score, 95.0);
        assert_eq!(report.fields.recommended_category, "CS");
        assert!(!report.attempt.is_degraded());
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_fetch() {
        let (fetcher, requests) = source(None);
        let pipeline = heuristic_pipeline(fetcher, "unused");

        let result = pipeline.run(&DocumentRef::new("", "https://x/a.pdf")).await;

        assert!(matches!(result, Err(PipelineError::InvalidRequest(_))));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let (fetcher, _) = source(None);
        let pipeline = heuristic_pipeline(fetcher, "unused");

        let err = pipeline
            .run(&DocumentRef::new("9", "https://x/missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(FetchError::Status { status: 404, .. })));
        assert!(err.to_string().starts_with("failed to download file"));
    }

    #[tokio::test]
    async fn test_run_and_store_writes_payload() {
        let (fetcher, _) = source(Some((png_bytes(), FormatHint::content_type("image/png"))));
        let pipeline = heuristic_pipeline(fetcher, "Asha Verma 81%");
        let store = StubStore {
            fail: false,
            updates: Mutex::new(Vec::new()),
        };

        let (report, updated) = pipeline
            .run_and_store(&DocumentRef::new("5", "https://x/a.png"), &store, "Verified")
            .await
            .unwrap();

        assert_eq!(report.fields.name.as_deref(), Some("Asha Verma"));
        assert_eq!(updated, json!([{ "id": "5", "status": "Verified" }]));

        let updates = store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "5");
        assert_eq!(updates[0].1, UpdatePayload::from_fields("Verified", &report.fields));
    }

    #[tokio::test]
    async fn test_store_failure_carries_report() {
        let (fetcher, _) = source(Some((png_bytes(), FormatHint::content_type("image/png"))));
        let pipeline = heuristic_pipeline(fetcher, "Asha Verma 81%");
        let store = StubStore {
            fail: true,
            updates: Mutex::new(Vec::new()),
        };

        let err = pipeline
            .run_and_store(&DocumentRef::new("5", "https://x/a.png"), &store, "Verified")
            .await
            .unwrap_err();

        let report = err.report().expect("report carried");
        assert_eq!(report.fields.grade_value, Some(81.0));
        assert!(err.to_string().contains("failed updating submission"));
    }
}
