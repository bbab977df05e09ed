use anyhow::{bail, Result};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token states of each row, L2-normalised.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]` with 1 for real tokens.
/// Returns `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, seq_len, hidden_dim) = match hidden.dims() {
        [b, t, h] => (*b, *t, *h),
        dims => bail!("hidden states must be [B,T,H], got {:?}", dims),
    };
    if attention_mask.dims() != [batch, seq_len] {
        bail!("attention mask must be [{batch},{seq_len}], got {:?}", attention_mask.dims());
    }

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_broadcast = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    // rows with no real tokens would divide by zero
    let lengths = mask.sum(1)?.unsqueeze(1)?.maximum(1f64)?;
    let mean = sum.broadcast_div(&lengths)?;

    let eps_val = match hidden.dtype() { DType::F16 | DType::BF16 => 1e-6f64, _ => 1e-12f64 };
    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + eps_val)?;
    let normalized = mean.broadcast_div(&norm)?;
    if normalized.dims() != [batch, hidden_dim] {
        bail!("pooled shape mismatch: {:?}", normalized.dims());
    }
    Ok(normalized)
}
