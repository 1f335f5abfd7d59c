//! Text extraction from prescription images and scanned PDFs
//!
//! Images are cleaned up (grayscale, contrast, sharpen, brightness) before
//! being handed to tesseract; PDFs are rasterised page by page.

mod preprocess;
mod tesseract;

pub use preprocess::{is_pdf, ImagePreprocessor};
pub use tesseract::TesseractOcr;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Trait for OCR engines
///
/// Implementations:
/// - `TesseractOcr`: tesseract CLI (pdftoppm for PDFs)
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract text from an image or PDF on disk
    async fn extract_text(&self, path: &Path) -> Result<String>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}
