//! Medicine info caching
//!
//! Grounded answers are cached by normalised generic name so repeated
//! lookups skip the embedding and completion round trips.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::config::CacheConfig;

use super::lookup::MedicineInfo;

#[derive(Debug, Clone)]
struct CachedInfo {
    info: MedicineInfo,
    cached_at: DateTime<Utc>,
    hit_count: u32,
}

/// TTL cache for medicine info answers
pub struct MedicineInfoCache {
    cache: RwLock<HashMap<String, CachedInfo>>,
    max_entries: usize,
    ttl_seconds: u64,
}

impl MedicineInfoCache {
    pub fn new(max_entries: usize, ttl_seconds: u64) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_entries,
            ttl_seconds,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl_secs)
    }

    fn hash_name(name: &str) -> String {
        let normalized = name.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cached answer for a generic name, if present and not expired
    pub fn get(&self, name: &str) -> Option<MedicineInfo> {
        let key = Self::hash_name(name);
        let mut cache = self.cache.write();

        let entry = cache.get_mut(&key)?;
        let age = Utc::now().signed_duration_since(entry.cached_at);
        if age.num_seconds().max(0) as u64 >= self.ttl_seconds {
            tracing::debug!("Cache miss (TTL expired): {}", &key[..12]);
            cache.remove(&key);
            return None;
        }

        entry.hit_count += 1;
        tracing::debug!("Cache hit: {} (hits: {})", &key[..12], entry.hit_count);
        Some(entry.info.clone())
    }

    /// Store an answer; ungrounded answers are ignored
    pub fn put(&self, name: &str, info: MedicineInfo) {
        if !info.grounded || self.max_entries == 0 {
            return;
        }

        let key = Self::hash_name(name);
        let mut cache = self.cache.write();

        if cache.len() >= self.max_entries && !cache.contains_key(&key) {
            if let Some(oldest_key) = cache
                .iter()
                .min_by_key(|(_, v)| v.cached_at)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest_key);
            }
        }

        cache.insert(
            key.clone(),
            CachedInfo {
                info,
                cached_at: Utc::now(),
                hit_count: 0,
            },
        );
        tracing::debug!("Cached medicine info: {}", &key[..12]);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
        tracing::info!("Medicine info cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            entries: cache.len(),
            total_hits: cache.values().map(|e| e.hit_count).sum(),
            max_entries: self.max_entries,
            ttl_seconds: self.ttl_seconds,
        }
    }
}

impl Default for MedicineInfoCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_hits: u32,
    pub max_entries: usize,
    pub ttl_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, grounded: bool) -> MedicineInfo {
        MedicineInfo {
            medicine: name.to_string(),
            generic_name: name.to_string(),
            info: format!("About {}", name),
            grounded,
            best_distance: Some(0.2),
            matched_indices: vec![0],
        }
    }

    #[test]
    fn test_cache_hit() {
        let cache = MedicineInfoCache::new(10, 3600);
        cache.put("paracetamol", info("paracetamol", true));

        let hit = cache.get("  Paracetamol ").unwrap();
        assert_eq!(hit.info, "About paracetamol");
        assert_eq!(cache.stats().total_hits, 1);
    }

    #[test]
    fn test_limited_answers_not_cached() {
        let cache = MedicineInfoCache::new(10, 3600);
        cache.put("unobtainium", info("unobtainium", false));
        assert!(cache.get("unobtainium").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_eviction_at_capacity() {
        let cache = MedicineInfoCache::new(2, 3600);
        cache.put("a", info("a", true));
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put("b", info("b", true));
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put("c", info("c", true));

        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = MedicineInfoCache::new(10, 0);
        cache.put("ibuprofen", info("ibuprofen", true));
        assert!(cache.get("ibuprofen").is_none());
    }
}
