//! Context assembly and confidence estimation.
//!
//! Retrieved chunk texts are joined in rank order with a blank line between
//! them. Confidence is the mean similarity of the chunks that made it into
//! the context, `0.0` when there are none.

use docqa_core::types::{RetrievedChunk, SourceRef};

pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Unbounded assembly: every retrieved chunk is included.
pub fn assemble(retrieved: &[RetrievedChunk]) -> (String, f32) {
    let context = retrieved.iter().map(|c| c.chunk_text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
    (context, mean_similarity(retrieved))
}

pub fn mean_similarity(chunks: &[RetrievedChunk]) -> f32 {
    if chunks.is_empty() {
        return 0.0;
    }
    chunks.iter().map(|c| c.similarity).sum::<f32>() / chunks.len() as f32
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub context: String,
    pub confidence: f32,
    /// The chunks behind `context`, in rank order.
    pub included: Vec<RetrievedChunk>,
    pub dropped: usize,
}

impl AssembledContext {
    pub fn sources(&self) -> Vec<SourceRef> {
        self.included.iter().map(SourceRef::from).collect()
    }
}

/// Assembly with an optional bound on the joined context length in characters.
///
/// Chunks are taken in rank order until the next one would overflow the
/// bound; that chunk and everything ranked below it are dropped. The
/// top-ranked chunk is always kept, even if it alone exceeds the bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler {
    max_chars: Option<usize>,
}

impl ContextAssembler {
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { max_chars }
    }

    pub fn unbounded() -> Self {
        Self { max_chars: None }
    }

    pub fn assemble(&self, retrieved: &[RetrievedChunk]) -> AssembledContext {
        let keep = match self.max_chars {
            None => retrieved.len(),
            Some(limit) => {
                let sep = CONTEXT_SEPARATOR.chars().count();
                let mut used = 0usize;
                let mut keep = 0usize;
                for (i, chunk) in retrieved.iter().enumerate() {
                    let cost = chunk.chunk_text.chars().count() + if i == 0 { 0 } else { sep };
                    if i > 0 && used + cost > limit {
                        break;
                    }
                    used += cost;
                    keep = i + 1;
                }
                keep
            }
        };
        let dropped = retrieved.len() - keep;
        if dropped > 0 {
            tracing::warn!(kept = keep, dropped, max_chars = ?self.max_chars, "context bound reached, dropping lowest-ranked chunks");
        }
        let included = retrieved[..keep].to_vec();
        let (context, confidence) = assemble(&included);
        AssembledContext { context, confidence, included, dropped }
    }
}
