use std::sync::Arc;

use docqa_core::traits::{Embedder, VectorStore};
use docqa_core::types::RetrievedChunk;
use docqa_core::{Error, Result};

/// Maps a cosine distance onto `[0, 1]`, higher meaning closer.
///
/// Strictly decreasing on `[0, 1]`; distances outside that range clamp and NaN maps to 0.
pub fn similarity_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Top `top_k` chunks of `collection` for `question`, most similar first.
    ///
    /// An empty collection is `Ok(vec![])`; a collaborator failure is `Error::Retrieval`.
    pub fn retrieve(&self, question: &str, top_k: usize, collection: &str) -> Result<Vec<RetrievedChunk>> {
        let vector = self
            .embedder
            .embed_batch(&[question.to_string()])
            .map_err(|e| retrieval_error("embedding the question", &e))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Retrieval("embedder returned no vector for the question".to_string()))?;
        let matches = self.store.query(collection, &vector, top_k).map_err(|e| retrieval_error("querying the store", &e))?;

        let mut out: Vec<RetrievedChunk> = matches
            .into_iter()
            .map(|m| RetrievedChunk {
                chunk_text: m.document,
                similarity: similarity_from_distance(m.distance),
                source_id: m.metadata.source_id,
                index: m.metadata.index,
            })
            .collect();
        out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        if out.is_empty() {
            tracing::info!(collection, "retrieval found no chunks");
        } else {
            tracing::debug!(collection, hits = out.len(), top = out[0].similarity, "retrieved chunks");
        }
        Ok(out)
    }
}

fn retrieval_error(stage: &str, err: &anyhow::Error) -> Error {
    tracing::error!(error = %format!("{err:#}"), "retrieval failed while {}", stage);
    Error::Retrieval(format!("{stage}: {err:#}"))
}
