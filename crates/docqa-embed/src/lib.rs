//! docqa-embed
//!
//! Sentence embeddings for chunks and questions. The production embedder runs
//! `all-MiniLM-L6-v2` locally with candle; `APP_USE_FAKE_EMBEDDINGS=1` swaps in
//! a deterministic hashed bag-of-words embedder for tests and offline work.

use anyhow::{anyhow, Result};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use candle_core::Device;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use twox_hash::XxHash64;

use docqa_core::traits::Embedder;

pub mod device;
pub mod model_files;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use model_files::{load_var_builder, resolve_model_dir};
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";
pub const MODEL_DIR_ENV: &str = "APP_EMBED_MODEL_DIR";
pub const FAKE_DIM: usize = 384;
const MAX_SEQ_LEN: usize = 256;
const BATCH_SIZE: usize = 32;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    pub fn new(model_dir: Option<&Path>) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir, MODEL_DIR_ENV, MODEL_NAME)?;
        tracing::info!(model = MODEL_NAME, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_text = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let raw: serde_json::Value = serde_json::from_str(&config_text)?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json is missing hidden_size"))? as usize;
        let max_positions = raw
            .get("max_position_embeddings")
            .and_then(serde_json::Value::as_u64)
            .map_or(MAX_SEQ_LEN, |v| v as usize);
        let pad_id = raw.get("pad_token_id").and_then(serde_json::Value::as_u64).map_or(0, |v| v as u32);

        let vb = load_var_builder(&model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len: MAX_SEQ_LEN.min(max_positions), pad_id })
    }

    fn embed_rows(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let rows = self.embed_rows(batch)?;
            for row in &rows {
                if row.len() != self.dim { return Err(anyhow!("embedding has {} dims, expected {}", row.len(), self.dim)); }
            }
            out.extend(rows);
        }
        tracing::debug!(texts = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

/// Hashed bag-of-words vectors: shared words mean shared dimensions.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for word in text.split_whitespace() {
            let token: String = word.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 1.0 + (((h >> 32) as u32) as f32 / u32::MAX as f32) * 0.1;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn use_fake() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    if use_fake() { tracing::info!("using FakeEmbedder"); return Ok(Box::new(FakeEmbedder::new(FAKE_DIM))); }
    Ok(Box::new(BertEmbedder::new(model_dir)?))
}

static SHARED: OnceLock<Arc<dyn Embedder>> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Process-wide embedder, loaded on first call and kept until exit.
///
/// `model_dir` only matters for the call that performs the load.
pub fn shared_embedder(model_dir: Option<&Path>) -> Result<Arc<dyn Embedder>> {
    if let Some(e) = SHARED.get() { return Ok(Arc::clone(e)); }
    let _guard = INIT.lock().map_err(|_| anyhow!("embedder initialisation lock poisoned"))?;
    if let Some(e) = SHARED.get() { return Ok(Arc::clone(e)); }
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(model_dir)?);
    let _ = SHARED.set(Arc::clone(&embedder));
    Ok(embedder)
}
