//! Plain-text extraction for uploaded documents.
use std::path::{Path, PathBuf};

use docqa_core::traits::TextExtractor;
use docqa_core::{Error, Result};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Identity of a document in the store: its file name.
pub fn source_id_for(path: &Path) -> String {
    path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Copy `path` into `dir` under its file name and return the stored copy.
///
/// A file already inside `dir` is used in place.
pub fn persist_document(dir: &Path, path: &Path) -> Result<PathBuf> {
    let source_id = source_id_for(path);
    let file_name = path.file_name().ok_or_else(|| Error::extraction(&source_id, "path has no file name"))?;
    std::fs::create_dir_all(dir).map_err(|e| Error::extraction(&source_id, e))?;
    let target = dir.join(file_name);
    let same = match (path.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same {
        std::fs::copy(path, &target).map_err(|e| Error::extraction(&source_id, e))?;
        tracing::debug!(source_id = %source_id, to = %target.display(), "document stored");
    }
    Ok(target)
}

/// Delete the stored documents directly inside `dir`. Other files and
/// subdirectories are left alone.
pub fn clear_documents(dir: &Path) -> std::io::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    tracing::info!(dir = %dir.display(), removed, "stored documents cleared");
    Ok(removed)
}

/// pdf-extract panics on some malformed files.
fn extract_pdf(path: &Path) -> std::result::Result<String, String> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("PDF parser failed on a malformed file".to_string()),
    }
}

#[derive(Debug, Default, Clone)]
pub struct FileExtractor;

impl TextExtractor for FileExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let source_id = source_id_for(path);
        let text = match extension(path).as_deref() {
            Some("pdf") => extract_pdf(path).map_err(|reason| Error::extraction(&source_id, reason))?,
            Some("txt") => {
                let bytes = std::fs::read(path).map_err(|e| Error::extraction(&source_id, e))?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            _ => return Err(Error::extraction(source_id, "unsupported file type (expected .pdf or .txt)")),
        };
        if text.trim().is_empty() {
            // typical for scanned, image-only PDFs
            return Err(Error::extraction(source_id, "no extractable text"));
        }
        Ok(text)
    }
}
