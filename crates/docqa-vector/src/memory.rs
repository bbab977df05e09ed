use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use docqa_core::traits::VectorStore;
use docqa_core::types::{ChunkId, QueryMatch, StoredVector};

use crate::distance::cosine_distance;

type Collection = BTreeMap<ChunkId, StoredVector>;

/// Brute-force in-process store. Same contract as the Lance store, nothing persisted.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Collection>>> {
        self.collections.read().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Collection>>> {
        self.collections.write().map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl VectorStore for MemoryVectorStore {
    fn upsert(&self, collection: &str, records: &[StoredVector]) -> Result<()> {
        let mut guard = self.write()?;
        let col = guard.entry(collection.to_string()).or_default();
        for r in records {
            col.insert(r.id.clone(), r.clone());
        }
        Ok(())
    }

    fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let guard = self.read()?;
        let Some(col) = guard.get(collection) else { return Ok(Vec::new()) };
        let mut scored: Vec<QueryMatch> = col
            .values()
            .map(|r| QueryMatch {
                id: r.id.clone(),
                document: r.chunk_text.clone(),
                distance: cosine_distance(vector, &r.embedding),
                metadata: r.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn delete_collection(&self, collection: &str) -> Result<()> {
        self.write()?.remove(collection);
        Ok(())
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.read()?.get(collection).map_or(0, BTreeMap::len))
    }

    fn sources(&self, collection: &str) -> Result<Vec<String>> {
        let guard = self.read()?;
        let Some(col) = guard.get(collection) else { return Ok(Vec::new()) };
        let set: BTreeSet<&str> = col.values().map(|r| r.metadata.source_id.as_str()).collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }
}
