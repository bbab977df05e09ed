//! docqa-generate
//!
//! Answer generation. `T5Generator` runs `flan-t5-base` locally with greedy
//! decoding so output is reproducible; `APP_USE_FAKE_GENERATION=1` selects an
//! extractive fake that needs no weights.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use candle_core::{Device, Tensor, D};
use candle_transformers::models::t5::{Config as T5Config, T5ForConditionalGeneration};
use tokenizers::Tokenizer;

use docqa_core::traits::Generator;
use docqa_embed::{load_var_builder, resolve_model_dir, select_device};

pub mod prompt;

pub use prompt::{fit_token_budget, grounded_prompt, prompt_head, prompt_tail, split_prompt, NOT_IN_CONTEXT};

pub const MODEL_NAME: &str = "flan-t5-base";
pub const MODEL_DIR_ENV: &str = "APP_GEN_MODEL_DIR";
/// Encoder input budget. Sized to hold the default `rag.max_context_chars`
/// context plus instruction and question.
pub const MAX_INPUT_TOKENS: usize = 2048;

pub struct T5Generator {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    decoder_start: u32,
    eos: u32,
}

impl T5Generator {
    pub fn new(model_dir: Option<&Path>) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir, MODEL_DIR_ENV, MODEL_NAME)?;
        tracing::info!(model = MODEL_NAME, dir = %model_dir.display(), "loading generation model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let mut config: T5Config = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        config.use_cache = true;

        let vb = load_var_builder(&model_dir, &device)?;
        let model = T5ForConditionalGeneration::load(vb, &config)?;
        let decoder_start = u32::try_from(config.decoder_start_token_id.unwrap_or(config.pad_token_id))?;
        let eos = u32::try_from(config.eos_token_id)?;
        tracing::info!("generation model loaded");
        Ok(Self { model: Mutex::new(model), tokenizer, device, decoder_start, eos })
    }

    fn encode_text(&self, text: &str, special_tokens: bool) -> Result<Vec<u32>> {
        let enc = self.tokenizer.encode(text, special_tokens).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(enc.get_ids().to_vec())
    }

    /// Prompt ids within [`MAX_INPUT_TOKENS`]. Grounded prompts lose the end of
    /// their context, never the question.
    fn encode_prompt(&self, prompt: &str) -> Result<Vec<u32>> {
        let mut ids = self.encode_text(prompt, true)?;
        if ids.len() <= MAX_INPUT_TOKENS {
            return Ok(ids);
        }
        match split_prompt(prompt) {
            Some((question, context)) => {
                let head = self.encode_text(&prompt_head(), false)?;
                let context = self.encode_text(context, false)?;
                let tail = self.encode_text(&prompt_tail(question), false)?;
                Ok(fit_token_budget(&head, &context, &tail, self.eos, MAX_INPUT_TOKENS))
            }
            None => {
                tracing::warn!(tokens = ids.len(), "prompt exceeds encoder budget, keeping its end");
                Ok(ids.split_off(ids.len() - MAX_INPUT_TOKENS))
            }
        }
    }

    fn decode_greedy(&self, model: &mut T5ForConditionalGeneration, prompt: &str, max_tokens: usize) -> Result<Vec<u32>> {
        let ids = self.encode_prompt(prompt)?;
        let input = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input)?;

        let mut output = vec![self.decoder_start];
        for step in 0..max_tokens {
            // with the kv cache on, only the newest token is fed after the first step
            let feed = if step == 0 { &output[..] } else { &output[output.len() - 1..] };
            let decoder_ids = Tensor::new(feed, &self.device)?.unsqueeze(0)?;
            let logits = model.decode(&decoder_ids, &encoder_output)?.squeeze(0)?;
            let next = logits.argmax(D::Minus1)?.to_scalar::<u32>()?;
            if next == self.eos { break; }
            output.push(next);
        }
        Ok(output.split_off(1))
    }
}

impl Generator for T5Generator {
    fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let start = Instant::now();
        let mut model = lock_recovering(&self.model);
        // a panic mid-decode can leave a stale cache behind
        model.clear_kv_cache();
        let tokens = self.decode_greedy(&mut model, prompt, max_tokens);
        model.clear_kv_cache();
        let tokens = tokens?;
        let text = self.tokenizer.decode(&tokens, true).map_err(|e| anyhow!("Detokenization failed: {}", e))?;
        tracing::debug!(tokens = tokens.len(), elapsed_ms = start.elapsed().as_millis() as u64, "generated answer");
        Ok(text.trim().to_string())
    }
}

/// Lock `mutex`, taking the guard back from a previous panicking holder.
pub fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extractive stand-in: answers with the context sentence sharing the most
/// words with the question.
#[derive(Debug, Default, Clone)]
pub struct FakeGenerator;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

impl Generator for FakeGenerator {
    fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let Some((question, context)) = split_prompt(prompt) else { return Ok(NOT_IN_CONTEXT.to_string()) };
        let wanted = words(question);
        let best = context
            .split_inclusive(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| (words(s).intersection(&wanted).count(), s))
            .filter(|(overlap, _)| *overlap > 0)
            // first sentence wins ties
            .fold(None::<(usize, &str)>, |acc, cur| match acc {
                Some(a) if a.0 >= cur.0 => Some(a),
                _ => Some(cur),
            });
        Ok(match best {
            Some((_, sentence)) => sentence.split_whitespace().take(max_tokens).collect::<Vec<_>>().join(" "),
            None => NOT_IN_CONTEXT.to_string(),
        })
    }
}

fn use_fake() -> bool {
    std::env::var("APP_USE_FAKE_GENERATION").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_generator(model_dir: Option<&Path>) -> Result<Box<dyn Generator>> {
    if use_fake() { tracing::info!("using FakeGenerator"); return Ok(Box::new(FakeGenerator)); }
    Ok(Box::new(T5Generator::new(model_dir)?))
}

static SHARED: OnceLock<Arc<dyn Generator>> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Process-wide generator, loaded on first call and kept until exit.
pub fn shared_generator(model_dir: Option<&Path>) -> Result<Arc<dyn Generator>> {
    if let Some(g) = SHARED.get() { return Ok(Arc::clone(g)); }
    let _guard = INIT.lock().map_err(|_| anyhow!("generator initialisation lock poisoned"))?;
    if let Some(g) = SHARED.get() { return Ok(Arc::clone(g)); }
    let generator: Arc<dyn Generator> = Arc::from(get_default_generator(model_dir)?);
    let _ = SHARED.set(Arc::clone(&generator));
    Ok(generator)
}
