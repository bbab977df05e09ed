//! Overlapping, boundary-aware document chunking.
//!
//! Chunks are exact slices of the input measured in characters. A chunk ends
//! right after the coarsest separator (paragraph, line, sentence, whitespace)
//! found inside the `chunk_size` window; only when none applies is the text
//! cut hard at `chunk_size`. Every chunk after the first starts `overlap`
//! characters before the previous chunk's end, so dropping the first
//! `overlap` characters of each later chunk reconstructs the input.

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Split points from coarsest to finest. Separators within a tier are equivalent.
const SEPARATOR_TIERS: &[&[&str]] = &[&["\n\n"], &["\n"], &[".", "!", "?"], &[" ", "\t"]];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 150 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_size ({}) must be greater than overlap ({})",
                self.chunk_size, self.overlap
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split one document. Empty or whitespace-only text yields no chunks.
    pub fn chunk(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        split_spans(text, self.config.chunk_size, self.config.overlap)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                text: text[start..end].to_string(),
                index,
                source_id: source_id.to_string(),
            })
            .collect()
    }
}

/// One-shot form of [`Chunker::chunk`] that validates the sizes first.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize, source_id: &str) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(ChunkingConfig { chunk_size, overlap })?.chunk(text, source_id))
}

/// Byte spans of the chunks of `text`, left to right.
fn split_spans(text: &str, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    // byte offset of every char boundary, plus the end of the text
    let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total = bounds.len() - 1;

    let mut spans = Vec::new();
    let mut start = 0usize;
    loop {
        if total - start <= chunk_size {
            spans.push((bounds[start], text.len()));
            break;
        }
        let window = &text[bounds[start]..bounds[start + chunk_size]];
        let end = start + natural_cut(window, overlap).unwrap_or(chunk_size);
        spans.push((bounds[start], bounds[end]));
        // end - start > overlap, so this always advances
        start = end - overlap;
    }
    spans
}

/// Char length of the longest prefix of `window` ending just after a separator
/// of the coarsest tier that keeps the prefix longer than `overlap`.
fn natural_cut(window: &str, overlap: usize) -> Option<usize> {
    for tier in SEPARATOR_TIERS {
        let cut = tier.iter().filter_map(|sep| window.rfind(sep).map(|at| at + sep.len())).max();
        if let Some(byte_cut) = cut {
            let chars = window[..byte_cut].chars().count();
            if chars > overlap {
                return Some(chars);
            }
        }
    }
    None
}
