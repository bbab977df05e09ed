mod common;

use std::sync::Arc;

use docqa_core::traits::VectorStore;
use docqa_core::types::SourceRef;
use docqa_core::AnswerError;
use docqa_generate::FakeGenerator;
use docqa_rag::answer::EMPTY_ANSWER;
use docqa_vector::MemoryVectorStore;

use common::*;

#[test]
fn capital_of_france_scenario() {
    let (pipeline, _) = memory_pipeline();
    pipeline.ingest_text("The capital of France is Paris.", "doc1").expect("index");

    let result = pipeline.ask("What is the capital of France?");
    assert!(result.is_ok(), "unexpected error: {:?}", result.error);
    assert!(result.answer.as_deref().unwrap_or_default().contains("Paris"));
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].source_id, "doc1");
    assert_eq!(result.sources[0].index, 0);
    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
}

#[test]
fn asking_before_anything_is_indexed_has_no_context() {
    let (pipeline, _) = memory_pipeline();
    let result = pipeline.ask("anything");
    assert_eq!(result.error.as_deref(), Some("No relevant context found."));
    assert_eq!(result.answer, None);
    assert!(result.sources.is_empty());
    assert_eq!(result.confidence, 0.0);
    assert_eq!(pipeline.answer("anything"), Err(AnswerError::NoContext));
}

#[test]
fn freshly_reset_store_has_no_context() {
    let (pipeline, store) = memory_pipeline();
    pipeline.ingest_text("The capital of France is Paris.", "doc1").unwrap();
    store.upsert("another", &[]).unwrap();
    pipeline.reset().unwrap();
    assert!(store.list_collections().unwrap().is_empty());
    assert!(pipeline.retriever().retrieve("capital", 5, pipeline.collection()).unwrap().is_empty());
    let result = pipeline.ask("What is the capital of France?");
    assert_eq!(result.error.as_deref(), Some("No relevant context found."));
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn generator_error_becomes_a_failure_result() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_with(fake_embedder(), store, Arc::new(FailingGenerator));
    pipeline.ingest_text("The capital of France is Paris.", "doc1").unwrap();

    let result = pipeline.ask("What is the capital of France?");
    let err = result.error.expect("error set");
    assert!(err.contains("model crashed"), "{err}");
    assert_eq!(result.answer, None);
    assert!(result.sources.is_empty());
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn generator_panic_is_contained() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_with(fake_embedder(), store, Arc::new(PanickingGenerator));
    pipeline.ingest_text("The capital of France is Paris.", "doc1").unwrap();

    let result = pipeline.ask("What is the capital of France?");
    let err = result.error.expect("error set");
    assert!(err.contains("generator blew up"), "{err}");
    assert!(result.sources.is_empty());

    // the pipeline stays usable afterwards
    let again = pipeline.ask("What is the capital of France?");
    assert!(again.error.is_some());
}

#[test]
fn healthy_generation_works_after_a_panic() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_with(fake_embedder(), store, Arc::new(PanicOnceGenerator::default()));
    pipeline.ingest_text("The capital of France is Paris.", "doc1").unwrap();

    let first = pipeline.ask("What is the capital of France?");
    assert!(first.error.expect("error set").contains("generator blew up"));

    let second = pipeline.ask("What is the capital of France?");
    assert!(second.is_ok(), "unexpected error: {:?}", second.error);
    assert!(second.answer.unwrap().contains("Paris"));
    assert_eq!(second.sources.len(), 1);
}

#[test]
fn blank_generation_is_a_failure() {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    let pipeline = pipeline_with(fake_embedder(), store, Arc::new(BlankGenerator));
    pipeline.ingest_text("The capital of France is Paris.", "doc1").unwrap();
    assert_eq!(pipeline.answer("capital?"), Err(AnswerError::Generation(EMPTY_ANSWER.to_string())));
}

#[test]
fn retrieval_failure_is_reported_not_treated_as_empty() {
    let pipeline = pipeline_with(fake_embedder(), Arc::new(BrokenStore), Arc::new(FakeGenerator));
    let outcome = pipeline.answer("capital?");
    match outcome {
        Err(AnswerError::Retrieval(msg)) => assert!(msg.contains("index file corrupt"), "{msg}"),
        other => panic!("expected retrieval failure, got {other:?}"),
    }
    let result = pipeline.ask("capital?");
    assert_ne!(result.error.as_deref(), Some("No relevant context found."));
    assert!(result.error.is_some());
}

#[test]
fn sources_follow_retrieval_order_and_confidence_is_their_mean() {
    let pipeline = pipeline_with(fake_embedder(), Arc::new(CannedStore::with_distances(&[0.1, 0.3, 0.5])), Arc::new(FakeGenerator));
    let answer = pipeline.answer("chunk number").expect("answer");
    let indices: Vec<usize> = answer.sources.iter().map(|s: &SourceRef| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let expected = (0.9 + 0.7 + 0.5) / 3.0;
    assert!((answer.confidence - expected).abs() < 1e-5);
    assert!(answer.text.contains("chunk number"));
}

#[test]
fn top_k_limits_sources() {
    let pipeline = pipeline_with(fake_embedder(), Arc::new(CannedStore::with_distances(&[0.1, 0.2, 0.3, 0.4])), Arc::new(FakeGenerator));
    let result = pipeline.ask_with("chunk number", 2);
    assert_eq!(result.sources.len(), 2);
}
