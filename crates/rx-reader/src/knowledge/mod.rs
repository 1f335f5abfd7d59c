//! Medicine knowledge base: fixed tables, embedding index, and grounded lookups

pub mod builder;
pub mod cache;
pub mod index;
pub mod lookup;
pub mod tables;

pub use builder::{read_corpus, IndexBuilder};
pub use cache::{CacheStats, MedicineInfoCache};
pub use index::{l2_normalize, IndexEntry, KnowledgeIndex, SearchHit};
pub use lookup::{normalize_name, query_variations, MedicineInfo, MedicineLookup};
pub use tables::{brand_to_generic, standard_dosage, standard_dosage_note, StandardDosage};
