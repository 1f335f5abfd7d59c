//! preprocess → OCR → parse

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ocr::{ImagePreprocessor, OcrEngine};

use super::parser::PrescriptionParser;
use super::types::PrescriptionAnalysis;

/// Runs the full read of a prescription file
pub struct PrescriptionPipeline {
    preprocessor: ImagePreprocessor,
    ocr: Arc<dyn OcrEngine>,
    parser: PrescriptionParser,
}

impl PrescriptionPipeline {
    pub fn new(
        preprocessor: ImagePreprocessor,
        ocr: Arc<dyn OcrEngine>,
        parser: PrescriptionParser,
    ) -> Self {
        Self {
            preprocessor,
            ocr,
            parser,
        }
    }

    /// Preprocess and OCR a file
    pub async fn extract_text(&self, path: &Path) -> Result<String> {
        let preprocessor = self.preprocessor.clone();
        let input = path.to_path_buf();
        let processed: PathBuf = tokio::task::spawn_blocking(move || preprocessor.preprocess(&input))
            .await
            .map_err(|e| Error::internal(format!("Preprocessing task failed: {}", e)))??;

        let result = self.ocr.extract_text(&processed).await;

        if processed != path {
            if let Err(e) = tokio::fs::remove_file(&processed).await {
                tracing::warn!("Failed to remove {}: {}", processed.display(), e);
            }
        }

        result
    }

    /// Read a prescription file
    ///
    /// OCR failures are errors. Parser failures are logged and produce an
    /// empty medicine list alongside the OCR text.
    pub async fn analyze(&self, path: &Path) -> Result<PrescriptionAnalysis> {
        let ocr_text = self.extract_text(path).await?;
        tracing::info!("OCR text ({} chars) from {}", ocr_text.len(), path.display());

        if ocr_text.trim().is_empty() {
            tracing::warn!("OCR produced no text for {}", path.display());
            return Ok(PrescriptionAnalysis {
                ocr_text,
                medicines: Vec::new(),
            });
        }

        let medicines = match self.parser.parse(&ocr_text).await {
            Ok(medicines) => medicines,
            Err(e) => {
                tracing::warn!("LLM parse error: {}", e);
                Vec::new()
            }
        };

        Ok(PrescriptionAnalysis { ocr_text, medicines })
    }
}
