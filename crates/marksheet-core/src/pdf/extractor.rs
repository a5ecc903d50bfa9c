//! PDF text and page-image extraction using lopdf and pdf-extract.

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, imageops::FilterType};
use lopdf::{Document, Object, ObjectId};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// US Letter, used when a page declares no MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    max_pixels: u64,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            max_pixels: PdfConfig::default().max_render_pixels,
        }
    }

    /// Limit the pixel count of decoded and rendered images.
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }

    fn page_id(&self, doc: &Document, page: u32) -> Result<ObjectId> {
        doc.get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Decode every image XObject referenced by a page's resources.
    fn page_images(&self, doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        let Some(Object::Dictionary(resources)) = inherited_attribute(doc, page_id, b"Resources")
        else {
            return images;
        };

        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                for (_name, obj_ref) in xobj_dict.iter() {
                    if let Ok((_, obj)) = doc.dereference(obj_ref) {
                        if let Some(img) = self.try_extract_image_from_object(doc, obj) {
                            images.push(img);
                        }
                    }
                }
            }
        }

        images
    }

    fn try_extract_image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        let subtype = dict.get(b"Subtype").ok()?;
        if subtype.as_name().ok()? != b"Image" {
            return None;
        }

        let width = image_dimension(dict.get(b"Width").ok()?)?;
        let height = image_dimension(dict.get(b"Height").ok()?)?;

        trace!("Found image object: {}x{}", width, height);

        if u64::from(width) * u64::from(height) > self.max_pixels {
            warn!(
                "Skipping {}x{} image, over the {} pixel budget",
                width, height, self.max_pixels
            );
            return None;
        }

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => {
                    arr.first().and_then(|o| o.as_name().ok())
                }
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    trace!("Decoding JPEG image");
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter");
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        image_from_raw(&data, width, height, color_space, bits)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads bytes, so keep the decrypted form
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_pages_text(&self) -> Result<Vec<String>> {
        self.document()?;

        // pdf-extract panics on some malformed fonts
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
        }));

        match outcome {
            Ok(Ok(pages)) => {
                debug!("Extracted text layer from {} pages", pages.len());
                Ok(pages)
            }
            Ok(Err(e)) => Err(PdfError::TextExtraction(e.to_string())),
            Err(_) => {
                warn!("pdf-extract panicked while reading the text layer");
                Err(PdfError::TextExtraction("text extraction panicked".to_string()))
            }
        }
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let doc = self.document()?;
        let page_id = self.page_id(doc, page)?;

        // A scanned page is one large image; take the biggest one on the page.
        let image = self
            .page_images(doc, page_id)
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| {
                PdfError::ImageExtraction(format!("No images found on page {}", page))
            })?;

        let (target_w, target_h) = target_size(&media_box(doc, page_id), dpi);
        let (target_w, target_h) = fit_within(target_w, target_h, self.max_pixels);
        let (w, h) = image.dimensions();

        debug!(
            "Rendering page {} at {} DPI: {}x{} -> {}x{}",
            page, dpi, w, h, target_w, target_h
        );

        if (w, h) == (target_w, target_h) || target_w == 0 || target_h == 0 {
            return Ok(image);
        }

        Ok(image.resize_exact(target_w, target_h, FilterType::Triangle))
    }
}

/// Look up a page attribute, following the `Parent` chain for inherited values.
fn inherited_attribute(doc: &Document, node_id: ObjectId, key: &[u8]) -> Option<Object> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(value) = dict.get(key) {
        if let Ok((_, resolved)) = doc.dereference(value) {
            return Some(resolved.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => inherited_attribute(doc, *parent_id, key),
        _ => None,
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Some(Object::Array(values)) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };

    let numbers: Vec<f32> = values
        .iter()
        .filter_map(|v| match v {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r as f32),
            _ => None,
        })
        .collect();

    match numbers.as_slice() {
        [x0, y0, x1, y1] => [*x0, *y0, *x1, *y1],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Positive `Width`/`Height` entry of an image dictionary.
fn image_dimension(value: &Object) -> Option<u32> {
    let value = value.as_i64().ok()?;
    u32::try_from(value).ok().filter(|v| *v > 0)
}

/// Scale `width`×`height` down, keeping the aspect ratio, to at most
/// `max_pixels` pixels.
fn fit_within(width: u32, height: u32, max_pixels: u64) -> (u32, u32) {
    let pixels = u64::from(width) * u64::from(height);
    if pixels <= max_pixels {
        return (width, height);
    }

    let scale = (max_pixels as f64 / pixels as f64).sqrt();
    let scaled = |side: u32| ((f64::from(side) * scale).floor() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Pixel size of a page box (in points) rendered at `dpi`.
fn target_size(media_box: &[f32; 4], dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    let width = (media_box[2] - media_box[0]).abs() * scale;
    let height = (media_box[3] - media_box[1]).abs() * scale;
    (width.round() as u32, height.round() as u32)
}

fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = u64::from(width) * u64::from(height);
    let (Ok(expected_gray), Some(Ok(expected_rgb))) = (
        usize::try_from(pixels),
        pixels.checked_mul(3).map(usize::try_from),
    ) else {
        return None;
    };

    match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= expected_rgb => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..expected_rgb].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" if data.len() >= expected_gray => {
            let rgb: Vec<u8> = data[..expected_gray]
                .iter()
                .flat_map(|&gray| [gray, gray, gray])
                .collect();
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => {
            trace!(
                "Could not decode image: data_len={}, expected_rgb={}, expected_gray={}",
                data.len(),
                expected_rgb,
                expected_gray
            );
            None
        }
    }
}
