//! tesseract / pdftoppm command-line OCR

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

use super::{is_pdf, OcrEngine};

/// OCR through the tesseract CLI
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract_cmd: String,
    pdftoppm_cmd: String,
    psm: u8,
    pdf_dpi: u32,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            tesseract_cmd: config.tesseract_cmd.clone(),
            pdftoppm_cmd: config.pdftoppm_cmd.clone(),
            psm: config.page_segmentation_mode,
            pdf_dpi: config.pdf_dpi,
        }
    }

    /// Check if tesseract can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.tesseract_cmd)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Blocking extraction; dispatches on file type
    pub fn extract_blocking(&self, path: &Path) -> Result<String> {
        if is_pdf(path) {
            self.extract_pdf(path)
        } else {
            self.extract_image(path)
        }
    }

    fn extract_image(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.tesseract_cmd)
            .arg(path)
            .arg("stdout")
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|e| missing_tool(&self.tesseract_cmd, "tesseract-ocr", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ocr(format!("tesseract error: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        tracing::info!("OCR extracted {} characters from {}", text.len(), path.display());
        Ok(text)
    }

    fn extract_pdf(&self, path: &Path) -> Result<String> {
        let temp_dir = tempfile::Builder::new().prefix("rx-reader-ocr-").tempdir()?;
        let prefix = temp_dir.path().join("page");

        let output = Command::new(&self.pdftoppm_cmd)
            .arg("-r")
            .arg(self.pdf_dpi.to_string())
            .arg("-png")
            .arg(path)
            .arg(&prefix)
            .output()
            .map_err(|e| missing_tool(&self.pdftoppm_cmd, "poppler-utils", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ocr(format!("pdftoppm error: {}", stderr.trim())));
        }

        let pages = page_images(temp_dir.path())?;
        if pages.is_empty() {
            return Err(Error::ocr("pdftoppm produced no pages"));
        }

        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            texts.push(self.extract_image(page)?.trim_end().to_string());
        }

        tracing::info!("OCR processed {} PDF pages from {}", pages.len(), path.display());
        Ok(texts.join("\n\n"))
    }
}

/// Rasterised page files in name order (pdftoppm zero-pads page numbers)
fn page_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    pages.sort();
    Ok(pages)
}

fn missing_tool(cmd: &str, package: &str, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::ocr(format!(
            "{} not found. Install with: apt install {}",
            cmd, package
        ))
    } else {
        Error::ocr(format!("Failed to run {}: {}", cmd, err))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let engine = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || engine.extract_blocking(&path))
            .await
            .map_err(|e| Error::internal(format!("OCR task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
