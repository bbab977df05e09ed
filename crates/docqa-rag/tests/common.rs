#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use docqa_core::config::RagSettings;
use docqa_core::traits::{Embedder, Generator, VectorStore};
use docqa_core::types::{ChunkMeta, QueryMatch, StoredVector};
use docqa_embed::FakeEmbedder;
use docqa_generate::{lock_recovering, FakeGenerator};
use docqa_rag::RagPipeline;
use docqa_vector::MemoryVectorStore;

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize { 8 }
    fn max_len(&self) -> usize { 8 }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding backend unavailable"))
    }
}

pub struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
        Err(anyhow!("model crashed"))
    }
}

pub struct PanickingGenerator;

impl Generator for PanickingGenerator {
    fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
        panic!("generator blew up")
    }
}

/// Panics on its first call while holding its model lock, then behaves.
#[derive(Default)]
pub struct PanicOnceGenerator {
    model: Mutex<FakeGenerator>,
    panicked: AtomicBool,
}

impl Generator for PanicOnceGenerator {
    fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let model = lock_recovering(&self.model);
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("generator blew up");
        }
        model.generate(prompt, max_tokens)
    }
}

pub struct BlankGenerator;

impl Generator for BlankGenerator {
    fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
        Ok("   \n".to_string())
    }
}

/// Query always fails; writes succeed and are dropped.
pub struct BrokenStore;

impl VectorStore for BrokenStore {
    fn upsert(&self, _collection: &str, _records: &[StoredVector]) -> Result<()> { Ok(()) }
    fn query(&self, _collection: &str, _vector: &[f32], _top_k: usize) -> Result<Vec<QueryMatch>> {
        Err(anyhow!("index file corrupt"))
    }
    fn delete_collection(&self, _collection: &str) -> Result<()> { Ok(()) }
    fn list_collections(&self) -> Result<Vec<String>> { Ok(Vec::new()) }
    fn count(&self, _collection: &str) -> Result<usize> { Ok(0) }
    fn sources(&self, _collection: &str) -> Result<Vec<String>> { Ok(Vec::new()) }
}

/// Returns canned matches regardless of the query.
pub struct CannedStore(pub Vec<QueryMatch>);

impl CannedStore {
    pub fn with_distances(distances: &[f32]) -> Self {
        Self(
            distances
                .iter()
                .enumerate()
                .map(|(i, &d)| QueryMatch {
                    id: format!("doc_{i}"),
                    document: format!("chunk number {i}"),
                    distance: d,
                    metadata: ChunkMeta { source_id: "doc".to_string(), index: i },
                })
                .collect(),
        )
    }
}

impl VectorStore for CannedStore {
    fn upsert(&self, _collection: &str, _records: &[StoredVector]) -> Result<()> { Ok(()) }
    fn query(&self, _collection: &str, _vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }
    fn delete_collection(&self, _collection: &str) -> Result<()> { Ok(()) }
    fn list_collections(&self) -> Result<Vec<String>> { Ok(vec!["canned".to_string()]) }
    fn count(&self, _collection: &str) -> Result<usize> { Ok(self.0.len()) }
    fn sources(&self, _collection: &str) -> Result<Vec<String>> { Ok(vec!["doc".to_string()]) }
}

pub fn fake_embedder() -> Arc<dyn Embedder> {
    Arc::new(FakeEmbedder::new(docqa_embed::FAKE_DIM))
}

pub fn small_settings() -> RagSettings {
    RagSettings { chunk_size: 200, chunk_overlap: 20, ..RagSettings::default() }
}

/// Fake models over an in-memory store.
pub fn memory_pipeline() -> (RagPipeline, Arc<MemoryVectorStore>) {
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = RagPipeline::new(small_settings(), fake_embedder(), store.clone(), Arc::new(FakeGenerator)).expect("pipeline");
    (pipeline, store)
}

pub fn pipeline_with(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, generator: Arc<dyn Generator>) -> RagPipeline {
    RagPipeline::new(small_settings(), embedder, store, generator).expect("pipeline")
}
