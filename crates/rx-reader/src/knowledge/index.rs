//! Flat exact-search embedding index over knowledge passages
//!
//! Distances are squared Euclidean (what a flat L2 index reports). With
//! unit-length vectors that is `2 - 2·cos`, so the default gate of 1.0
//! admits passages with cosine similarity of at least 0.5.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// One indexed passage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Nearest-neighbour result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Position of the passage in the index
    pub index: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
    pub text: String,
}

/// In-memory index persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeIndex {
    /// Embedding model the vectors came from
    pub model: String,
    pub dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl KnowledgeIndex {
    /// Create an empty index
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
            entries: Vec::new(),
        }
    }

    /// Add a passage
    pub fn add(&mut self, text: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        self.check_dimensions(&embedding)?;
        self.entries.push(IndexEntry {
            text: text.into(),
            embedding,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Passage text by position
    pub fn text(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.text.as_str())
    }

    /// Up to `k` nearest passages, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.check_dimensions(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, squared_l2(query, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(index, distance)| SearchHit {
                index,
                distance,
                text: self.entries[index].text.clone(),
            })
            .collect())
    }

    /// Load an index written by `save`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::knowledge(format!("Failed to read index {}: {}", path.display(), e))
        })?;
        let index: Self = serde_json::from_str(&content)
            .map_err(|e| Error::knowledge(format!("Corrupt index {}: {}", path.display(), e)))?;

        if let Some(bad) = index.entries.iter().find(|e| e.embedding.len() != index.dimensions) {
            return Err(Error::knowledge(format!(
                "Index entry has {} dimensions, header says {}",
                bad.embedding.len(),
                index.dimensions
            )));
        }

        tracing::info!(
            "Loaded knowledge index: {} passages, {} dimensions ({})",
            index.len(),
            index.dimensions,
            index.model
        );
        Ok(index)
    }

    /// Write the index as JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        tracing::info!("Saved knowledge index ({} passages) to {}", self.len(), path.display());
        Ok(())
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::knowledge(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Scale a vector to unit length (zero vectors are left alone)
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KnowledgeIndex {
        let mut index = KnowledgeIndex::new("test", 2);
        index.add("east", vec![1.0, 0.0]).unwrap();
        index.add("north", vec![0.0, 1.0]).unwrap();
        index.add("north-east", vec![0.7, 0.7]).unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_distance() {
        let hits = sample().search(&[1.0, 0.1], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "east");
        assert_eq!(hits[1].text, "north-east");
        assert!((hits[0].distance - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_k_larger_than_index() {
        assert_eq!(sample().search(&[0.0, 0.0], 10).unwrap().len(), 3);
        assert!(KnowledgeIndex::new("test", 2).search(&[0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = sample();
        assert!(matches!(index.search(&[1.0], 1), Err(Error::Knowledge(_))));
        assert!(index.add("bad", vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");
        sample().save(&path).unwrap();

        let loaded = KnowledgeIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.text(2), Some("north-east"));
        assert_eq!(loaded.model, "test");
    }

    #[test]
    fn test_load_rejects_inconsistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"model":"m","dimensions":3,"entries":[{"text":"x","embedding":[1.0]}]}"#,
        )
        .unwrap();
        assert!(matches!(KnowledgeIndex::load(&path), Err(Error::Knowledge(_))));
    }
}
