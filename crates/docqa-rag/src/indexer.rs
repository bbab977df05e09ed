use std::sync::Arc;

use docqa_core::chunker::Chunker;
use docqa_core::traits::{Embedder, VectorStore};
use docqa_core::types::StoredVector;
use docqa_core::{Error, Result};

/// Chunks a document, embeds the chunks in one batch and upserts them.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, chunker: Chunker) -> Self {
        Self { embedder, store, chunker }
    }

    /// Index one document into `collection`, returning the number of chunks stored.
    ///
    /// Text that yields no chunks is an extraction failure. Embedding or
    /// storage failures are `Error::Indexing`; nothing is reported as stored.
    pub fn index(&self, document_text: &str, source_id: &str, collection: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(document_text, source_id);
        if chunks.is_empty() {
            return Err(Error::extraction(source_id, "document produced no chunks"));
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).map_err(|e| Error::indexing(source_id, format!("embedding failed: {e:#}")))?;
        if embeddings.len() != chunks.len() {
            return Err(Error::indexing(
                source_id,
                format!("embedder returned {} vectors for {} chunks", embeddings.len(), chunks.len()),
            ));
        }
        let records: Vec<StoredVector> = chunks.iter().zip(embeddings).map(|(c, e)| StoredVector::from_chunk(c, e)).collect();
        self.store
            .upsert(collection, &records)
            .map_err(|e| Error::indexing(source_id, format!("storage failed: {e:#}")))?;
        tracing::info!(source_id, collection, chunks = records.len(), "indexed document");
        Ok(records.len())
    }
}
