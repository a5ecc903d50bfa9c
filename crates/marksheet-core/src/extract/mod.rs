//! Text extraction: raw document bytes to plain text.
//!
//! ```text
//! FormatSelect ──pdf──▶ PdfPath ──blank──▶ OcrFallback (page 1) ──▶ Terminal
//!      │                   └──text──────────────────────────────▶ Terminal
//!      └──other──▶ ImagePath (decode, RGB, OCR) ─────────────────▶ Terminal
//! ```
//!
//! There is exactly one fallback hop. Every failure inside a path ends in
//! an empty [`ExtractedText`]; nothing here returns an error.

use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::models::config::PdfConfig;
use crate::models::document::{ExtractedText, RawDocument, TextSource};
use crate::ocr::TextRecognizer;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Page rendered when the text layer is empty.
const OCR_FALLBACK_PAGE: u32 = 1;

/// Creates a fresh PDF processor for each document.
pub type PdfFactory = Box<dyn Fn() -> Box<dyn PdfProcessor> + Send + Sync>;

/// Text extractor selecting a strategy by declared format.
pub struct TextExtractor {
    recognizer: Box<dyn TextRecognizer>,
    pdf_factory: PdfFactory,
    config: PdfConfig,
}

impl TextExtractor {
    /// Create an extractor backed by [`PdfExtractor`].
    pub fn new(recognizer: Box<dyn TextRecognizer>, config: PdfConfig) -> Self {
        let max_pixels = config.max_render_pixels;
        Self {
            recognizer,
            pdf_factory: Box::new(move || {
                Box::new(PdfExtractor::new().with_max_pixels(max_pixels))
            }),
            config,
        }
    }

    /// Use a different PDF implementation.
    pub fn with_pdf_factory(mut self, factory: PdfFactory) -> Self {
        self.pdf_factory = factory;
        self
    }

    /// Extract text from a document.
    pub fn extract(&self, document: &RawDocument) -> ExtractedText {
        let start = Instant::now();

        let text = if document.format_hint().is_pdf() {
            debug!("Format hint declares PDF ({} bytes)", document.len());
            self.extract_pdf(document.bytes())
        } else {
            debug!("Format hint declares an image ({} bytes)", document.len());
            self.extract_image(document.bytes())
        };

        info!(
            "Extracted {} chars via {:?} in {}ms",
            text.content.trim().len(),
            text.source_strategy,
            start.elapsed().as_millis()
        );

        text
    }

    fn extract_pdf(&self, bytes: &[u8]) -> ExtractedText {
        let mut pdf = (self.pdf_factory)();

        if let Err(e) = pdf.load(bytes) {
            warn!("Unreadable PDF, no text extracted: {}", e);
            return ExtractedText::empty(TextSource::TextLayer);
        }

        let text = match pdf.extract_pages_text() {
            Ok(pages) => pages.join("\n"),
            Err(e) => {
                warn!("Text layer extraction failed, no text extracted: {}", e);
                return ExtractedText::empty(TextSource::TextLayer);
            }
        };

        if !text.trim().is_empty() {
            return ExtractedText::new(text, TextSource::TextLayer);
        }

        info!(
            "PDF text layer empty, falling back to OCR on page {}",
            OCR_FALLBACK_PAGE
        );

        match pdf.render_page(OCR_FALLBACK_PAGE, self.config.render_dpi) {
            Ok(image) => self.recognize(image),
            Err(e) => {
                warn!("Could not render page {} for OCR: {}", OCR_FALLBACK_PAGE, e);
                ExtractedText::empty(TextSource::OpticalRecognition)
            }
        }
    }

    fn extract_image(&self, bytes: &[u8]) -> ExtractedText {
        match image::load_from_memory(bytes) {
            Ok(image) => self.recognize(image),
            Err(e) => {
                warn!("Could not decode image: {}", e);
                ExtractedText::empty(TextSource::OpticalRecognition)
            }
        }
    }

    fn recognize(&self, image: DynamicImage) -> ExtractedText {
        let rgb = DynamicImage::ImageRgb8(image.into_rgb8());

        match self.recognizer.recognize(&rgb) {
            Ok(text) => ExtractedText::new(text, TextSource::OpticalRecognition),
            Err(e) => {
                warn!("OCR failed: {}", e);
                ExtractedText::empty(TextSource::OpticalRecognition)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, PdfError};
    use crate::models::document::FormatHint;
    use crate::pdf::fixtures;
    use image::{ColorType, GenericImageView, ImageFormat, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    /// Records every image it is asked to read.
    #[derive(Clone, Default)]
    struct StubRecognizer {
        seen: Arc<Mutex<Vec<((u32, u32), ColorType)>>>,
        reply: Option<&'static str>,
    }

    impl StubRecognizer {
        fn replying(reply: &'static str) -> Self {
            Self {
                reply: Some(reply),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<((u32, u32), ColorType)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl TextRecognizer for StubRecognizer {
        fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
            self.seen
                .lock()
                .unwrap()
                .push((image.dimensions(), image.color()));
            self.reply
                .map(str::to_string)
                .ok_or_else(|| OcrError::Recognition("stub failure".into()))
        }
    }

    /// PDF with blank pages that records which pages were rendered.
    struct BlankPdf {
        pages: u32,
        broken_text_layer: bool,
        loads: Arc<Mutex<u32>>,
        rendered: Arc<Mutex<Vec<u32>>>,
    }

    impl PdfProcessor for BlankPdf {
        fn load(&mut self, _data: &[u8]) -> crate::pdf::Result<()> {
            *self.loads.lock().unwrap() += 1;
            Ok(())
        }

        fn page_count(&self) -> u32 {
            self.pages
        }

        fn extract_pages_text(&self) -> crate::pdf::Result<Vec<String>> {
            if self.broken_text_layer {
                return Err(PdfError::TextExtraction("bad font program".into()));
            }
            Ok(vec![" \n".to_string(); self.pages as usize])
        }

        fn render_page(&self, page: u32, _dpi: u32) -> crate::pdf::Result<DynamicImage> {
            if page > self.pages {
                return Err(PdfError::InvalidPage(page));
            }
            self.rendered.lock().unwrap().push(page);
            Ok(DynamicImage::new_rgba8(10, 10))
        }
    }

    fn blank_pdf_extractor(
        recognizer: StubRecognizer,
        pages: u32,
    ) -> (TextExtractor, Arc<Mutex<u32>>, Arc<Mutex<Vec<u32>>>) {
        stub_pdf_extractor(recognizer, pages, false)
    }

    fn stub_pdf_extractor(
        recognizer: StubRecognizer,
        pages: u32,
        broken_text_layer: bool,
    ) -> (TextExtractor, Arc<Mutex<u32>>, Arc<Mutex<Vec<u32>>>) {
        let loads = Arc::new(Mutex::new(0));
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let (l, r) = (loads.clone(), rendered.clone());

        let extractor = TextExtractor::new(Box::new(recognizer), PdfConfig::default())
            .with_pdf_factory(Box::new(move || {
                Box::new(BlankPdf {
                    pages,
                    broken_text_layer,
                    loads: l.clone(),
                    rendered: r.clone(),
                })
            }));

        (extractor, loads, rendered)
    }

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(12, 6, image::Rgba([10, 20, 30, 255]));
        let mut data = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    #[test]
    fn test_text_layer_skips_ocr() {
        let recognizer = StubRecognizer::replying("should not be used");
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), PdfConfig::default());

        let data = fixtures::text_pdf(&["Name: Asha Verma", "Total: 450"]);
        let document = RawDocument::new(data, FormatHint::content_type("application/pdf"));
        let text = extractor.extract(&document);

        assert_eq!(text.source_strategy, TextSource::TextLayer);
        assert!(text.content.contains("Asha Verma"));
        assert!(text.content.contains("Total: 450"));
        assert!(recognizer.calls().is_empty());
    }

    #[test]
    fn test_scanned_pdf_falls_back_to_ocr_at_render_dpi() {
        let recognizer = StubRecognizer::replying("Total: 450");
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), PdfConfig::default());

        let document = RawDocument::new(fixtures::image_pdf(8, 4), FormatHint::file_name("scan.pdf"));
        let text = extractor.extract(&document);

        assert_eq!(text, ExtractedText::new("Total: 450", TextSource::OpticalRecognition));
        assert_eq!(recognizer.calls(), vec![((600, 300), ColorType::Rgb8)]);
    }

    #[test]
    fn test_scanned_pdf_rendered_within_pixel_budget() {
        let recognizer = StubRecognizer::replying("Total: 450");
        let config = PdfConfig {
            max_render_pixels: 20_000,
            ..PdfConfig::default()
        };
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), config);

        let document = RawDocument::new(fixtures::image_pdf(8, 4), FormatHint::file_name("scan.pdf"));
        extractor.extract(&document);

        let calls = recognizer.calls();
        assert_eq!(calls.len(), 1);
        let ((w, h), _) = calls[0];
        assert!(u64::from(w) * u64::from(h) <= 20_000);
    }

    #[test]
    fn test_oversized_scan_yields_empty_text() {
        let recognizer = StubRecognizer::replying("unused");
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), PdfConfig::default());

        let data = fixtures::image_pdf_declared(70_000, 70_000, vec![0u8; 12]);
        let document = RawDocument::new(data, FormatHint::content_type("application/pdf"));
        let text = extractor.extract(&document);

        assert_eq!(text, ExtractedText::empty(TextSource::OpticalRecognition));
        assert!(recognizer.calls().is_empty());
    }

    #[test]
    fn test_ocr_fallback_reads_first_page_only() {
        let recognizer = StubRecognizer::replying("");
        let (extractor, loads, rendered) = blank_pdf_extractor(recognizer.clone(), 3);

        let document = RawDocument::new(b"%PDF-stub".to_vec(), FormatHint::content_type("application/pdf"));
        let text = extractor.extract(&document);

        assert_eq!(*loads.lock().unwrap(), 1);
        assert_eq!(*rendered.lock().unwrap(), vec![1]);
        assert_eq!(recognizer.calls().len(), 1);
        assert_eq!(text.source_strategy, TextSource::OpticalRecognition);
        assert!(text.is_empty());
    }

    #[test]
    fn test_text_layer_failure_is_terminal() {
        let recognizer = StubRecognizer::replying("should not be used");
        let (extractor, loads, rendered) = stub_pdf_extractor(recognizer.clone(), 2, true);

        let document = RawDocument::new(b"%PDF-stub".to_vec(), FormatHint::content_type("application/pdf"));
        let text = extractor.extract(&document);

        assert_eq!(text, ExtractedText::empty(TextSource::TextLayer));
        assert_eq!(*loads.lock().unwrap(), 1);
        assert!(rendered.lock().unwrap().is_empty());
        assert!(recognizer.calls().is_empty());
    }

    #[test]
    fn test_image_never_takes_pdf_path() {
        let recognizer = StubRecognizer::replying("Marks 85%");
        let (extractor, loads, rendered) = blank_pdf_extractor(recognizer.clone(), 1);

        let document = RawDocument::new(png_bytes(), FormatHint::content_type("image/png"));
        let text = extractor.extract(&document);

        assert_eq!(text.content, "Marks 85%");
        assert_eq!(*loads.lock().unwrap(), 0);
        assert!(rendered.lock().unwrap().is_empty());
        assert_eq!(recognizer.calls(), vec![((12, 6), ColorType::Rgb8)]);
    }

    #[test]
    fn test_empty_image_bytes_yield_empty_text() {
        let recognizer = StubRecognizer::replying("unused");
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), PdfConfig::default());

        let document = RawDocument::new(Vec::new(), FormatHint::content_type("image/jpeg"));
        let text = extractor.extract(&document);

        assert!(text.is_empty());
        assert!(recognizer.calls().is_empty());
    }

    #[test]
    fn test_malformed_pdf_yields_empty_text() {
        let recognizer = StubRecognizer::replying("unused");
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), PdfConfig::default());

        let document = RawDocument::new(
            b"%PDF-1.7\n garbage without xref".to_vec(),
            FormatHint::content_type("application/pdf"),
        );
        let text = extractor.extract(&document);

        assert!(text.is_empty());
        assert!(recognizer.calls().is_empty());
    }

    #[test]
    fn test_ocr_failure_yields_empty_text() {
        let recognizer = StubRecognizer::default();
        let extractor = TextExtractor::new(Box::new(recognizer.clone()), PdfConfig::default());

        let document = RawDocument::new(png_bytes(), FormatHint::file_name("marks.png"));
        let text = extractor.extract(&document);

        assert_eq!(text, ExtractedText::empty(TextSource::OpticalRecognition));
        assert_eq!(recognizer.calls().len(), 1);
    }
}
