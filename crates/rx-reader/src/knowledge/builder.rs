//! Build a knowledge index from a plain-text corpus

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

use super::index::{l2_normalize, KnowledgeIndex};

/// Read a corpus file: one passage per non-empty trimmed line
pub fn read_corpus(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::knowledge(format!("Failed to read corpus {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Embeds corpus passages into a `KnowledgeIndex`
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    model: String,
    normalize: bool,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, model: impl Into<String>, normalize: bool) -> Self {
        Self {
            embedder,
            model: model.into(),
            normalize,
        }
    }

    /// Build an index from the corpus at `corpus_path`
    pub async fn build(&self, corpus_path: &Path) -> Result<KnowledgeIndex> {
        let passages = read_corpus(corpus_path)?;
        self.build_from_passages(passages, |_| {}).await
    }

    /// Build an index from passages, reporting each embedded passage
    pub async fn build_from_passages<F>(
        &self,
        passages: Vec<String>,
        mut on_progress: F,
    ) -> Result<KnowledgeIndex>
    where
        F: FnMut(usize),
    {
        tracing::info!(
            "Embedding {} passages with {} ({})",
            passages.len(),
            self.embedder.name(),
            self.model
        );

        let mut index = KnowledgeIndex::new(self.model.clone(), self.embedder.dimensions());
        for (i, passage) in passages.into_iter().enumerate() {
            let mut embedding = self.embedder.embed(&passage).await?;
            if self.normalize {
                l2_normalize(&mut embedding);
            }
            index.add(passage, embedding)?;
            on_progress(i + 1);
        }

        Ok(index)
    }
}
