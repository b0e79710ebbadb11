//! PDF uploads: text for digital invoices, the embedded scan for image-only ones.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// What a PDF upload offers the extractor.
#[derive(Debug, Clone)]
pub enum PdfContent {
    /// Text layer long enough to extract from directly.
    Text(String),
    /// Scanned page with no usable text.
    Scan(DynamicImage),
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Operations the upload loader needs from a PDF backend.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Number of pages in the loaded document.
    fn page_count(&self) -> u32;

    /// Text of the whole document.
    fn extract_text(&self) -> Result<String>;

    /// First decodable embedded image, in page order.
    fn first_image(&self) -> Result<Option<DynamicImage>>;

    /// Prefer the text layer when it has at least `min_text_length`
    /// non-whitespace characters, otherwise fall back to the first image.
    fn content(&self, min_text_length: usize) -> Result<Option<PdfContent>> {
        let text = self.extract_text().unwrap_or_default();
        let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();

        if meaningful >= min_text_length {
            return Ok(Some(PdfContent::Text(text.trim().to_string())));
        }

        Ok(self.first_image()?.map(PdfContent::Scan))
    }
}
