use std::path::Path;

use crate::types::{QueryMatch, StoredVector};

/// Turns texts into fixed-length vectors. Order-preserving and deterministic
/// for a fixed model.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Persistent named collections of stored vectors.
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite by `StoredVector::id`.
    fn upsert(&self, collection: &str, records: &[StoredVector]) -> anyhow::Result<()>;
    /// Up to `top_k` nearest rows, closest first. A missing collection yields no rows.
    fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<QueryMatch>>;
    fn delete_collection(&self, collection: &str) -> anyhow::Result<()>;
    fn list_collections(&self) -> anyhow::Result<Vec<String>>;
    fn count(&self, collection: &str) -> anyhow::Result<usize>;
    /// Distinct `source_id`s stored in the collection, sorted.
    fn sources(&self, collection: &str) -> anyhow::Result<Vec<String>>;
}

/// Text generation with deterministic decoding.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, max_tokens: usize) -> anyhow::Result<String>;
}

/// Pulls plain text out of a stored document.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> crate::Result<String>;
}
