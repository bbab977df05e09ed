use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Locate a local model directory: explicit path, then `$env_key`, then `models/<name>`
/// relative to the working directory or its parent.
pub fn resolve_model_dir(explicit: Option<&Path>, env_key: &str, name: &str) -> Result<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() { tracing::info!(dir = %p.display(), "using configured model dir"); return Ok(p.to_path_buf()); }
        tracing::warn!(dir = %p.display(), "configured model dir does not exist");
    }
    if let Ok(dir) = std::env::var(env_key) {
        let p = PathBuf::from(&dir);
        if p.exists() { tracing::info!(dir = %p.display(), "using {}", env_key); return Ok(p); }
    }
    for base in ["models", "../models"] {
        let p = Path::new(base).join(name);
        if p.exists() { tracing::info!(dir = %p.display(), "using model dir"); return Ok(p); }
    }
    Err(anyhow!("Could not locate model directory for {} (set {})", name, env_key))
}

/// Load weights from `model.safetensors`, falling back to `pytorch_model.bin`.
pub fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let pickle = model_dir.join("pytorch_model.bin");
        if !pickle.exists() { return Err(anyhow!("No weights found in {}", model_dir.display())); }
        candle_core::pickle::read_all(&pickle)?.into_iter().collect()
    };
    tracing::debug!(tensors = tensors.len(), "weights loaded");
    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}
