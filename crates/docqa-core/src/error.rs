use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to extract text from {source_id}: {reason}")]
    Extraction { source_id: String, reason: String },

    #[error("Failed to index {source_id}: {reason}")]
    Indexing { source_id: String, reason: String },

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("No relevant context found.")]
    NoContext,

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl Error {
    pub fn extraction(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Extraction { source_id: source_id.into(), reason: reason.to_string() }
    }

    pub fn indexing(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Indexing { source_id: source_id.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failure states of a single question.
///
/// `Display` is the user-facing message carried in `AnswerResult::error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("No relevant context found.")]
    NoContext,

    #[error("{0}")]
    Retrieval(String),

    #[error("{0}")]
    Generation(String),
}
