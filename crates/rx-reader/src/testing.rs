//! Test doubles shared by unit tests

use async_trait::async_trait;
use image::{GrayImage, Luma};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ocr::OcrEngine;
use crate::providers::{CompletionOptions, EmbeddingProvider, LlmProvider};
use crate::whatsapp::PrescriptionAnalyzer;

/// LLM that returns a fixed answer and records every prompt
pub struct CannedLlm {
    answer: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<(String, CompletionOptions)>>,
}

impl CannedLlm {
    pub fn ok(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for CannedLlm {
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String> {
        self.prompts.lock().push((prompt.to_string(), options));
        self.answer.clone().map_err(Error::llm)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.answer.is_ok())
    }

    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }
}

/// OCR engine with a fixed result
pub struct FakeOcr {
    text: std::result::Result<String, String>,
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeOcr {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        self.seen.lock().push(path.to_path_buf());
        self.text.clone().map_err(Error::ocr)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Bag-of-keywords embedder: one axis per keyword plus a small constant axis
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    pub queries: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.queries.lock().push(text.to_string());
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if lower.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.keywords.len() + 1
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keywords"
    }
}

/// Analyzer with a fixed summary that records its calls
pub struct FakeAnalyzer {
    summary: std::result::Result<String, String>,
    pub calls: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeAnalyzer {
    pub fn ok(summary: &str) -> Arc<Self> {
        Arc::new(Self {
            summary: Ok(summary.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            summary: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PrescriptionAnalyzer for FakeAnalyzer {
    async fn analyze(&self, file: &Path, profile: &str) -> Result<String> {
        self.calls.lock().push((file.to_path_buf(), profile.to_string()));
        self.summary.clone().map_err(Error::internal)
    }
}

/// Write a small gradient image; the format follows the file extension
pub fn write_test_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let image = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 12 + y * 3) as u8]));
    image.save(&path).unwrap();
    path
}
