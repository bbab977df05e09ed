use docqa_core::traits::Embedder;
use docqa_embed::{get_default_embedder, shared_embedder, FakeEmbedder, FAKE_DIM};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading the model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(None).expect("embedder");
    assert_eq!(embedder.dim(), FAKE_DIM);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), FAKE_DIM);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_ranks_word_overlap_higher() {
    let e = FakeEmbedder::new(FAKE_DIM);
    let embs = e
        .embed_batch(&[
            "What is the capital of France?".to_string(),
            "The capital of France is Paris.".to_string(),
            "Bananas are yellow.".to_string(),
        ])
        .unwrap();
    assert!(cosine(&embs[0], &embs[1]) > cosine(&embs[0], &embs[2]));
}

#[test]
fn fake_embedder_ignores_case_and_punctuation() {
    let e = FakeEmbedder::new(64);
    let embs = e.embed_batch(&["Paris!".to_string(), "paris".to_string()]).unwrap();
    assert!((cosine(&embs[0], &embs[1]) - 1.0).abs() < 1e-5);
}

#[test]
fn empty_batch_gives_no_vectors() {
    let e = FakeEmbedder::new(16);
    assert!(e.embed_batch(&[]).unwrap().is_empty());
}

#[test]
fn shared_embedder_is_loaded_once() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let a = shared_embedder(None).unwrap();
    let b = shared_embedder(None).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}
