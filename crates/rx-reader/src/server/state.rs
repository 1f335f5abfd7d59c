//! Application state for the prescription API

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{EmbeddingConfig, RxConfig};
use crate::error::{Error, Result};
use crate::knowledge::{IndexBuilder, KnowledgeIndex, MedicineInfoCache, MedicineLookup};
use crate::ocr::{ImagePreprocessor, TesseractOcr};
use crate::prescription::{PrescriptionParser, PrescriptionPipeline};
use crate::providers::{embedder_from_config, llm_from_config, EmbeddingProvider};
use crate::storage::PrescriptionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RxConfig,
    /// preprocess → OCR → parse
    pipeline: PrescriptionPipeline,
    /// Grounded medicine information
    lookup: MedicineLookup,
    /// Prescription history
    store: PrescriptionStore,
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: RxConfig) -> Result<Self> {
        tracing::info!("Initializing prescription reader state...");

        let llm = llm_from_config(&config)?;
        let embedder = embedder_from_config(&config)?;

        let ocr = TesseractOcr::new(&config.ocr);
        if !ocr.is_available() {
            tracing::warn!(
                "tesseract not found ({}); uploads will fail until it is installed",
                config.ocr.tesseract_cmd
            );
        }

        let pipeline = PrescriptionPipeline::new(
            ImagePreprocessor::new(&config.ocr),
            Arc::new(ocr),
            PrescriptionParser::new(llm.clone(), &config.llm),
        );

        let index = Self::load_or_build_index(&config, embedder.clone()).await?;
        tracing::info!("Knowledge index ready ({} passages)", index.len());

        let lookup = MedicineLookup::new(embedder, llm, Arc::new(index), &config)
            .with_cache(MedicineInfoCache::from_config(&config.cache));

        let store = PrescriptionStore::open(&config.storage.database_path)?;

        tokio::fs::create_dir_all(&config.server.upload_dir).await?;

        Ok(Self::from_parts(config, pipeline, lookup, store))
    }

    /// Assemble state from already-built components
    pub fn from_parts(
        config: RxConfig,
        pipeline: PrescriptionPipeline,
        lookup: MedicineLookup,
        store: PrescriptionStore,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                lookup,
                store,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Load the persisted index, or embed the corpus when there is none
    async fn load_or_build_index(
        config: &RxConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<KnowledgeIndex> {
        let knowledge = &config.knowledge;

        if knowledge.index_path.exists() {
            let index = KnowledgeIndex::load(&knowledge.index_path)?;
            check_index_compatible(&index, &config.embeddings)?;
            return Ok(index);
        }

        if !knowledge.corpus_path.exists() {
            tracing::warn!(
                "No knowledge index or corpus at {}; medicine lookups will be limited",
                knowledge.corpus_path.display()
            );
            return Ok(KnowledgeIndex::new(
                config.embeddings.model.clone(),
                config.embeddings.dimensions,
            ));
        }

        let builder = IndexBuilder::new(
            embedder,
            config.embeddings.model.clone(),
            config.embeddings.normalize,
        );
        let index = builder.build(&knowledge.corpus_path).await?;

        if let Err(e) = index.save(&knowledge.index_path) {
            tracing::warn!("Failed to persist knowledge index: {}", e);
        }

        Ok(index)
    }

    pub fn config(&self) -> &RxConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &PrescriptionPipeline {
        &self.inner.pipeline
    }

    pub fn lookup(&self) -> &MedicineLookup {
        &self.inner.lookup
    }

    pub fn store(&self) -> &PrescriptionStore {
        &self.inner.store
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

/// A persisted index is only usable with the model and dimensions it was built with
fn check_index_compatible(index: &KnowledgeIndex, embeddings: &EmbeddingConfig) -> Result<()> {
    if index.dimensions != embeddings.dimensions {
        return Err(Error::Config(format!(
            "Knowledge index has {} dimensions but embeddings are configured for {}; \
             rebuild it with rx-reader-index",
            index.dimensions, embeddings.dimensions
        )));
    }

    let model_name = |name: &str| name.trim_end_matches(":latest").to_string();
    if model_name(&index.model) != model_name(&embeddings.model) {
        return Err(Error::Config(format!(
            "Knowledge index was built with '{}' but embeddings use '{}'; \
             rebuild it with rx-reader-index",
            index.model, embeddings.model
        )));
    }

    Ok(())
}
