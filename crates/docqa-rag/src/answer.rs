//! The answer state machine: retrieve, assemble, generate, package.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use docqa_core::traits::Generator;
use docqa_core::types::{Answer, AnswerResult};
use docqa_core::{AnswerError, Error};
use docqa_generate::grounded_prompt;

use crate::context::ContextAssembler;
use crate::retriever::Retriever;

pub const EMPTY_ANSWER: &str = "The model produced an empty answer.";

pub struct AnswerEngine {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    assembler: ContextAssembler,
    max_new_tokens: usize,
}

impl AnswerEngine {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, assembler: ContextAssembler, max_new_tokens: usize) -> Self {
        Self { retriever, generator, assembler, max_new_tokens }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn answer(&self, question: &str, top_k: usize, collection: &str) -> Result<Answer, AnswerError> {
        let retrieved = self.retriever.retrieve(question, top_k, collection).map_err(|e| AnswerError::Retrieval(e.to_string()))?;
        if retrieved.is_empty() {
            return Err(AnswerError::NoContext);
        }

        let assembled = self.assembler.assemble(&retrieved);
        let prompt = grounded_prompt(question, &assembled.context);
        let text = self.generator.generate(&prompt, self.max_new_tokens).map_err(|e| {
            tracing::error!(error = %format!("{e:#}"), "generation failed");
            AnswerError::Generation(Error::Generation(format!("{e:#}")).to_string())
        })?;
        let text = text.trim();
        if text.is_empty() {
            tracing::warn!("generator returned an empty answer");
            return Err(AnswerError::Generation(EMPTY_ANSWER.to_string()));
        }

        tracing::info!(sources = assembled.included.len(), confidence = assembled.confidence, "answered question");
        Ok(Answer { text: text.to_string(), sources: assembled.sources(), confidence: assembled.confidence })
    }

    /// Like [`AnswerEngine::answer`] but never fails or unwinds: every outcome,
    /// including a panic inside a collaborator, comes back as an `AnswerResult`.
    pub fn answer_result(&self, question: &str, top_k: usize, collection: &str) -> AnswerResult {
        match catch_unwind(AssertUnwindSafe(|| self.answer(question, top_k, collection))) {
            Ok(outcome) => outcome.into(),
            Err(panic) => {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    format!("Generation failed: {s}")
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    format!("Generation failed: {s}")
                } else {
                    "Generation failed: unexpected internal error".to_string()
                };
                tracing::error!(message = %msg, "question answering panicked");
                AnswerError::Generation(msg).into()
            }
        }
    }
}
