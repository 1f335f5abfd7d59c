//! Grounded medicine information lookup
//!
//! A medicine name is normalised, mapped from brand to generic, and searched
//! under several phrasings. Only when the closest passage clears the
//! distance gate is the LLM asked to answer from the retrieved context.

use serde::Serialize;
use std::sync::Arc;

use crate::config::RxConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{CompletionOptions, EmbeddingProvider, LlmProvider};

use super::cache::MedicineInfoCache;
use super::index::{l2_normalize, KnowledgeIndex, SearchHit};
use super::tables::{brand_to_generic, standard_dosage_note};

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Answer to a medicine information request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicineInfo {
    /// Normalised name as requested
    pub medicine: String,
    /// Generic name searched for
    pub generic_name: String,
    pub info: String,
    /// Whether the answer passed the confidence gate
    pub grounded: bool,
    /// Best squared L2 distance over all query variations
    pub best_distance: Option<f32>,
    /// Index positions of the passages used as context
    pub matched_indices: Vec<usize>,
}

impl MedicineInfo {
    fn limited(medicine: String, generic_name: String, best: Option<&BestMatch>) -> Self {
        let info = format!(
            "⚠️ Limited information available for '{}'. The system could not find reliable \
             details in the knowledge base. Please consult a healthcare professional or \
             pharmacist for accurate information.",
            generic_name
        );
        Self {
            medicine,
            generic_name,
            info,
            grounded: false,
            best_distance: best.map(|b| b.distance),
            matched_indices: best.map(|b| b.indices()).unwrap_or_default(),
        }
    }
}

struct BestMatch {
    distance: f32,
    hits: Vec<SearchHit>,
}

impl BestMatch {
    fn indices(&self) -> Vec<usize> {
        self.hits.iter().map(|h| h.index).collect()
    }

    fn context(&self) -> String {
        self.hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }
}

/// Lowercase and trim a medicine name
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Phrasings searched for each medicine
pub fn query_variations(name: &str) -> Vec<String> {
    vec![
        name.to_string(),
        format!("{} uses", name),
        format!("{} medicine drug", name),
        format!("{} tablet", name),
        format!("what is {} used for", name),
    ]
}

/// Retrieval-augmented medicine lookup
pub struct MedicineLookup {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    index: Arc<KnowledgeIndex>,
    cache: Option<MedicineInfoCache>,
    top_k: usize,
    distance_threshold: f32,
    normalize: bool,
    options: CompletionOptions,
}

impl MedicineLookup {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<KnowledgeIndex>,
        config: &RxConfig,
    ) -> Self {
        Self {
            embedder,
            llm,
            index,
            cache: None,
            top_k: config.knowledge.top_k,
            distance_threshold: config.knowledge.distance_threshold,
            normalize: config.embeddings.normalize,
            options: CompletionOptions::new(config.llm.temperature, config.llm.info_max_tokens),
        }
    }

    /// Cache grounded answers
    pub fn with_cache(mut self, cache: MedicineInfoCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    pub fn cache(&self) -> Option<&MedicineInfoCache> {
        self.cache.as_ref()
    }

    /// Look up information about a medicine
    pub async fn lookup(&self, name: &str) -> Result<MedicineInfo> {
        let medicine = normalize_name(name);
        if medicine.is_empty() {
            return Err(Error::BadRequest("Medicine name is empty".to_string()));
        }

        let generic_name = match brand_to_generic(&medicine) {
            Some(generic) => {
                tracing::info!("Converted brand '{}' → generic '{}'", medicine, generic);
                generic.to_string()
            }
            None => medicine.clone(),
        };

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&generic_name)) {
            return Ok(MedicineInfo { medicine, ..cached });
        }

        let best = self.best_match(&generic_name).await?;

        let best = match best {
            Some(best) if best.distance <= self.distance_threshold => best,
            other => {
                tracing::info!(
                    "Low confidence for '{}' (best distance: {:?}), returning limited answer",
                    generic_name,
                    other.as_ref().map(|b| b.distance)
                );
                return Ok(MedicineInfo::limited(medicine, generic_name, other.as_ref()));
            }
        };

        let prompt = PromptBuilder::medicine_info_prompt(&generic_name, &best.context());
        let answer = self.llm.complete(&prompt, self.options).await?;
        let info = format!("{}{}", answer.trim(), standard_dosage_note(&generic_name));

        let result = MedicineInfo {
            medicine,
            generic_name: generic_name.clone(),
            info,
            grounded: true,
            best_distance: Some(best.distance),
            matched_indices: best.indices(),
        };

        if let Some(cache) = &self.cache {
            cache.put(&generic_name, result.clone());
        }

        Ok(result)
    }

    /// Search every query variation and keep the one with the closest hit
    async fn best_match(&self, generic_name: &str) -> Result<Option<BestMatch>> {
        if self.index.is_empty() {
            tracing::warn!("Knowledge index is empty");
            return Ok(None);
        }

        let mut best: Option<BestMatch> = None;

        for query in query_variations(generic_name) {
            let mut embedding = self.embedder.embed(&query).await?;
            if self.normalize {
                l2_normalize(&mut embedding);
            }

            let hits = self.index.search(&embedding, self.top_k)?;
            let Some(first) = hits.first() else {
                continue;
            };

            if best.as_ref().map_or(true, |b| first.distance < b.distance) {
                best = Some(BestMatch {
                    distance: first.distance,
                    hits,
                });
            }
        }

        if let Some(best) = &best {
            tracing::debug!(
                "Best distance for '{}': {:.4}, top indices: {:?}",
                generic_name,
                best.distance,
                best.indices()
            );
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::IndexBuilder;
    use crate::testing::{CannedLlm, KeywordEmbedder};

    const KEYWORDS: &[&str] = &["paracetamol", "ibuprofen", "fever", "inflammation"];

    async fn lookup_with(llm: Arc<CannedLlm>, embedder: Arc<KeywordEmbedder>) -> MedicineLookup {
        let index = IndexBuilder::new(embedder.clone(), "kw", true)
            .build_from_passages(
                vec![
                    "paracetamol".to_string(),
                    "ibuprofen inflammation".to_string(),
                    "fever".to_string(),
                ],
                |_| {},
            )
            .await
            .unwrap();
        embedder.queries.lock().clear();
        MedicineLookup::new(embedder, llm, Arc::new(index), &RxConfig::default())
    }

    #[test]
    fn test_query_variations() {
        assert_eq!(
            query_variations("ibuprofen"),
            vec![
                "ibuprofen",
                "ibuprofen uses",
                "ibuprofen medicine drug",
                "ibuprofen tablet",
                "what is ibuprofen used for",
            ]
        );
    }

    #[tokio::test]
    async fn test_brand_name_grounded_answer() {
        let llm = CannedLlm::ok("  Paracetamol is a pain reliever.  ");
        let embedder = KeywordEmbedder::new(KEYWORDS);
        let lookup = lookup_with(llm.clone(), embedder.clone()).await;

        let info = lookup.lookup(" Dolo ").await.unwrap();

        assert!(info.grounded);
        assert_eq!(info.medicine, "dolo");
        assert_eq!(info.generic_name, "paracetamol");
        assert_eq!(info.matched_indices[0], 0);
        assert!(info.best_distance.unwrap() < 1e-6);
        assert!(info.info.starts_with("Paracetamol is a pain reliever.\n\nStandard Dosage Guidelines:"));
        assert!(info.info.contains("4000mg per day"));

        assert_eq!(embedder.queries.lock().len(), 5);
        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, CompletionOptions::new(0.1, 800));
        assert!(prompts[0].0.contains("paracetamol\n\n---\n\n"));
    }

    #[tokio::test]
    async fn test_unknown_medicine_is_limited() {
        let llm = CannedLlm::ok("should not be used");
        let lookup = lookup_with(llm.clone(), KeywordEmbedder::new(KEYWORDS)).await;

        let info = lookup.lookup("Unobtainium").await.unwrap();

        assert!(!info.grounded);
        assert!(info.best_distance.unwrap() > 1.0);
        assert_eq!(
            info.info,
            "⚠️ Limited information available for 'unobtainium'. The system could not find \
             reliable details in the knowledge base. Please consult a healthcare professional \
             or pharmacist for accurate information."
        );
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_index_is_limited() {
        let embedder = KeywordEmbedder::new(KEYWORDS);
        let llm = CannedLlm::ok("unused");
        let lookup = MedicineLookup::new(
            embedder.clone(),
            llm.clone(),
            Arc::new(KnowledgeIndex::new("kw", KEYWORDS.len() + 1)),
            &RxConfig::default(),
        );

        let info = lookup.lookup("ibuprofen").await.unwrap();
        assert!(!info.grounded);
        assert_eq!(info.best_distance, None);
        assert!(embedder.queries.lock().is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_gate_boundary_is_inclusive() {
        // unnormalised: "zzz" → [0,0,0,0,0.1], passage "paracetamol" → unit vector
        let mut config = RxConfig::default();
        config.embeddings.normalize = false;
        let mut index = KnowledgeIndex::new("kw", 5);
        index.add("exactly one away", vec![1.0, 0.0, 0.0, 0.0, 0.1]).unwrap();

        let llm = CannedLlm::ok("answer");
        let lookup = MedicineLookup::new(KeywordEmbedder::new(KEYWORDS), llm, Arc::new(index), &config);

        let info = lookup.lookup("zzz").await.unwrap();
        assert_eq!(info.best_distance, Some(1.0));
        assert!(info.grounded);
        assert_eq!(info.info, "answer");
    }

    #[tokio::test]
    async fn test_tied_variations_keep_the_earliest() {
        // "{name} uses" and "{name} tablet" both land exactly on a passage
        let mut config = RxConfig::default();
        config.embeddings.normalize = false;
        let mut index = KnowledgeIndex::new("kw", 3);
        index.add("aspirin uses passage", vec![1.0, 0.0, 0.1]).unwrap();
        index.add("aspirin tablet passage", vec![0.0, 1.0, 0.1]).unwrap();

        let llm = CannedLlm::ok("answer");
        let embedder = KeywordEmbedder::new(&["uses", "tablet"]);
        let lookup = MedicineLookup::new(embedder, llm.clone(), Arc::new(index), &config);

        let info = lookup.lookup("aspirin").await.unwrap();
        assert_eq!(info.best_distance, Some(0.0));
        assert_eq!(info.matched_indices, vec![0, 1]);

        let prompt = &llm.prompts.lock()[0].0;
        let uses = prompt.find("aspirin uses passage").unwrap();
        let tablet = prompt.find("aspirin tablet passage").unwrap();
        assert!(uses < tablet);
    }

    #[tokio::test]
    async fn test_cached_answers_skip_llm() {
        let llm = CannedLlm::ok("Ibuprofen reduces inflammation.");
        let lookup = lookup_with(llm.clone(), KeywordEmbedder::new(KEYWORDS))
            .await
            .with_cache(MedicineInfoCache::new(10, 3600));

        let first = lookup.lookup("ibuprofen").await.unwrap();
        let second = lookup.lookup("IBUPROFEN").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let lookup = lookup_with(CannedLlm::failing("down"), KeywordEmbedder::new(KEYWORDS)).await;
        assert!(matches!(lookup.lookup("paracetamol").await, Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let lookup = lookup_with(CannedLlm::ok(""), KeywordEmbedder::new(KEYWORDS)).await;
        assert!(matches!(lookup.lookup("   ").await, Err(Error::BadRequest(_))));
    }
}
