//! Domain types passed between the chunker, the stores and the answer pipeline.

use serde::{Deserialize, Serialize};

use crate::error::AnswerError;

pub type ChunkId = String;

/// Deterministic storage key of a chunk: `"{source_id}_{index}"`.
pub fn chunk_id(source_id: &str, index: usize) -> ChunkId {
    format!("{source_id}_{index}")
}

/// A bounded slice of one source document, the unit of embedding and retrieval.
///
/// - `text`: the exact characters of the document covered by this chunk
/// - `index`: 0-based position within the document, unique per `source_id`
/// - `source_id`: identity of the document (the uploaded file name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub source_id: String,
}

impl Chunk {
    pub fn id(&self) -> ChunkId {
        chunk_id(&self.source_id, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source_id: String,
    pub index: usize,
}

/// A persisted (embedding, text, metadata) triple owned by a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: ChunkId,
    pub embedding: Vec<f32>,
    pub chunk_text: String,
    pub metadata: ChunkMeta,
}

impl StoredVector {
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            embedding,
            chunk_text: chunk.text.clone(),
            metadata: ChunkMeta { source_id: chunk.source_id.clone(), index: chunk.index },
        }
    }
}

/// One row of a nearest-neighbour query, in store-native distance.
///
/// Lower `distance` is closer. Rows come back ordered by rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: ChunkId,
    pub document: String,
    pub distance: f32,
    pub metadata: ChunkMeta,
}

/// A chunk returned for a question. `similarity` is in `[0, 1]`, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_text: String,
    pub similarity: f32,
    pub source_id: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_id: String,
    pub index: usize,
    pub similarity: f32,
}

impl From<&RetrievedChunk> for SourceRef {
    fn from(chunk: &RetrievedChunk) -> Self {
        Self { source_id: chunk.source_id.clone(), index: chunk.index, similarity: chunk.similarity }
    }
}

/// A successful, grounded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
}

/// Flat view of one question's outcome for presentation layers.
///
/// Exactly one of `answer` / `error` is set. When `error` is set, `sources`
/// is empty and `confidence` is `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: Option<String>,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
    pub error: Option<String>,
}

impl AnswerResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self { answer: None, sources: Vec::new(), confidence: 0.0, error: Some(message.into()) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Answer> for AnswerResult {
    fn from(answer: Answer) -> Self {
        Self { answer: Some(answer.text), sources: answer.sources, confidence: answer.confidence, error: None }
    }
}

impl From<AnswerError> for AnswerResult {
    fn from(err: AnswerError) -> Self {
        Self::failure(err.to_string())
    }
}

impl From<Result<Answer, AnswerError>> for AnswerResult {
    fn from(outcome: Result<Answer, AnswerError>) -> Self {
        match outcome {
            Ok(answer) => answer.into(),
            Err(err) => err.into(),
        }
    }
}
