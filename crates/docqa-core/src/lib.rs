//! docqa-core
//!
//! Domain types, error taxonomy, collaborator traits and the chunker shared by
//! every crate of the document question-answering pipeline.

pub mod chunker;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{AnswerError, Error, Result};
