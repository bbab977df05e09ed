//! docqa-rag
//!
//! Retrieval-augmented question answering over a small document corpus:
//! indexing (chunk, embed, upsert), retrieval with distance-to-similarity
//! normalisation, bounded context assembly with a confidence estimate, and
//! an answer orchestrator that always returns a result instead of failing.

pub mod answer;
pub mod context;
pub mod extract;
pub mod indexer;
pub mod pipeline;
pub mod retriever;

pub use answer::AnswerEngine;
pub use context::{assemble, AssembledContext, ContextAssembler};
pub use extract::{clear_documents, persist_document, FileExtractor};
pub use indexer::Indexer;
pub use pipeline::{collect_documents, reset_store, IngestReport, RagPipeline, ResetSummary, EXAMPLE_QUESTIONS};
pub use retriever::{similarity_from_distance, Retriever};
