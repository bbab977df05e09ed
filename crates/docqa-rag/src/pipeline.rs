//! Facade wiring extraction, indexing and answering over one collection.

use anyhow::Result as AnyResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use docqa_core::chunker::Chunker;
use docqa_core::config::{resolve_with_base, RagSettings, Settings};
use docqa_core::traits::{Embedder, Generator, TextExtractor, VectorStore};
use docqa_core::types::{Answer, AnswerResult};
use docqa_core::{AnswerError, Result};
use docqa_vector::LanceVectorStore;

use crate::answer::AnswerEngine;
use crate::context::ContextAssembler;
use crate::extract::{clear_documents, is_supported, persist_document, source_id_for, FileExtractor};
use crate::indexer::Indexer;
use crate::retriever::Retriever;

pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What is the main topic of the document?",
    "Summarize the key findings.",
    "List the steps described in the manual.",
    "What are the limitations mentioned?",
    "Who are the authors?",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedDocument {
    pub source_id: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub source_id: String,
    pub error: String,
}

/// Outcome of a multi-document ingest. Failures never stop the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub loaded: Vec<LoadedDocument>,
    pub failed: Vec<FailedDocument>,
    /// Documents whose file name collided with an earlier one in the batch;
    /// the later file replaced the earlier one's chunks.
    pub replaced: Vec<PathBuf>,
}

/// Expand `paths` into the documents to ingest: files as given, directories
/// walked recursively for supported files in name order.
pub fn collect_documents(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for p in paths {
        if p.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(p)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file() && is_supported(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            out.extend(found);
        } else {
            out.push(p.clone());
        }
    }
    out
}

/// Collections and stored documents removed by a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub collections: usize,
    pub documents: usize,
}

/// Delete every collection, returning the store to its first-run state.
pub fn reset_store(store: &dyn VectorStore) -> AnyResult<usize> {
    let names = store.list_collections()?;
    for name in &names {
        store.delete_collection(name)?;
    }
    tracing::info!(collections = names.len(), "store reset");
    Ok(names.len())
}

pub struct RagPipeline {
    settings: RagSettings,
    store: Arc<dyn VectorStore>,
    extractor: Box<dyn TextExtractor>,
    documents_dir: Option<PathBuf>,
    indexer: Indexer,
    engine: AnswerEngine,
}

impl RagPipeline {
    pub fn new(
        settings: RagSettings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let chunker = Chunker::new(settings.chunking())?;
        let indexer = Indexer::new(Arc::clone(&embedder), Arc::clone(&store), chunker);
        let retriever = Retriever::new(embedder, Arc::clone(&store));
        let engine = AnswerEngine::new(retriever, generator, ContextAssembler::new(settings.max_context_chars), settings.max_new_tokens);
        Ok(Self { settings, store, extractor: Box::new(FileExtractor), documents_dir: None, indexer, engine })
    }

    /// Production wiring: shared local models, the on-disk LanceDB store and
    /// the document directory, all under `base`.
    pub fn from_settings(settings: &Settings, base: &Path) -> AnyResult<Self> {
        settings.validate()?;
        let embed_dir = settings.models.embedding_dir.as_ref().map(|d| resolve_with_base(base, d));
        let gen_dir = settings.models.generation_dir.as_ref().map(|d| resolve_with_base(base, d));
        let embedder = docqa_embed::shared_embedder(embed_dir.as_deref())?;
        let generator = docqa_generate::shared_generator(gen_dir.as_deref())?;
        let store: Arc<dyn VectorStore> = Arc::new(LanceVectorStore::open(&resolve_with_base(base, &settings.data.db_dir))?);
        let pipeline = Self::new(settings.rag.clone(), embedder, store, generator)?;
        Ok(pipeline.with_documents_dir(resolve_with_base(base, &settings.data.data_dir)))
    }

    /// Keep a copy of every ingested file in `dir`.
    pub fn with_documents_dir(mut self, dir: PathBuf) -> Self {
        self.documents_dir = Some(dir);
        self
    }

    pub fn documents_dir(&self) -> Option<&Path> {
        self.documents_dir.as_deref()
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn collection(&self) -> &str {
        &self.settings.collection
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn ingest_text(&self, text: &str, source_id: &str) -> Result<usize> {
        self.indexer.index(text, source_id, &self.settings.collection)
    }

    pub fn ingest_file(&self, path: &Path) -> Result<usize> {
        let stored = match &self.documents_dir {
            Some(dir) => persist_document(dir, path)?,
            None => path.to_path_buf(),
        };
        let text = self.extractor.extract_text(&stored)?;
        self.ingest_text(&text, &source_id_for(path))
    }

    pub fn ingest_paths(&self, paths: &[PathBuf]) -> IngestReport {
        self.ingest_documents(&collect_documents(paths), |_, _| {})
    }

    /// Ingest `files` one by one, calling `on_done` after each.
    pub fn ingest_documents<F>(&self, files: &[PathBuf], mut on_done: F) -> IngestReport
    where
        F: FnMut(&Path, &Result<usize>),
    {
        let mut report = IngestReport::default();
        for path in files {
            let outcome = self.ingest_file(path);
            on_done(path.as_path(), &outcome);
            let source_id = source_id_for(path);
            match outcome {
                Ok(chunks) => {
                    if let Some(existing) = report.loaded.iter_mut().find(|d| d.source_id == source_id) {
                        tracing::warn!(source_id = %source_id, path = %path.display(), "file name already loaded in this batch, replacing it");
                        existing.chunks = chunks;
                        report.replaced.push(path.clone());
                    } else {
                        report.loaded.push(LoadedDocument { source_id, chunks });
                    }
                }
                Err(e) => {
                    tracing::warn!(source_id = %source_id, error = %e, "document not loaded");
                    report.failed.push(FailedDocument { source_id, error: e.to_string() });
                }
            }
        }
        tracing::info!(loaded = report.loaded.len(), failed = report.failed.len(), "ingest finished");
        report
    }

    pub fn answer(&self, question: &str) -> std::result::Result<Answer, AnswerError> {
        self.engine.answer(question, self.settings.top_k, &self.settings.collection)
    }

    pub fn ask(&self, question: &str) -> AnswerResult {
        self.ask_with(question, self.settings.top_k)
    }

    pub fn ask_with(&self, question: &str, top_k: usize) -> AnswerResult {
        self.engine.answer_result(question, top_k, &self.settings.collection)
    }

    pub fn retriever(&self) -> &Retriever {
        self.engine.retriever()
    }

    /// Distinct documents stored in the active collection.
    pub fn loaded_sources(&self) -> AnyResult<Vec<String>> {
        self.store.sources(&self.settings.collection)
    }

    pub fn chunk_count(&self) -> AnyResult<usize> {
        self.store.count(&self.settings.collection)
    }

    pub fn clear_collection(&self, name: &str) -> AnyResult<()> {
        self.store.delete_collection(name)?;
        tracing::info!(collection = name, "collection cleared");
        Ok(())
    }

    /// Delete every collection and the stored documents.
    pub fn reset(&self) -> AnyResult<ResetSummary> {
        let collections = reset_store(self.store.as_ref())?;
        let documents = match &self.documents_dir {
            Some(dir) => clear_documents(dir)?,
            None => 0,
        };
        Ok(ResetSummary { collections, documents })
    }
}
