//! Grounding prompt shared by every generator.

const CONTEXT_MARKER: &str = "\n\nContext:\n";
const QUESTION_MARKER: &str = "\n\nQuestion: ";
const ANSWER_MARKER: &str = "\nAnswer:";

pub const INSTRUCTION: &str = "You are a helpful assistant. Answer the question using ONLY the context below. \
If the answer is not in the context, say 'I don't know.' Be as detailed as possible.";

/// The reply a grounded model gives when the context does not cover the question.
pub const NOT_IN_CONTEXT: &str = "I don't know.";

/// Everything before the context.
pub fn prompt_head() -> String {
    format!("{INSTRUCTION}{CONTEXT_MARKER}")
}

/// Everything after the context.
pub fn prompt_tail(question: &str) -> String {
    format!("{QUESTION_MARKER}{question}{ANSWER_MARKER}")
}

pub fn grounded_prompt(question: &str, context: &str) -> String {
    format!("{}{context}{}", prompt_head(), prompt_tail(question))
}

/// Inverse of [`grounded_prompt`]: `(question, context)`, or `None` for foreign prompts.
pub fn split_prompt(prompt: &str) -> Option<(&str, &str)> {
    let body = prompt.strip_prefix(INSTRUCTION)?.strip_prefix(CONTEXT_MARKER)?;
    let body = body.strip_suffix(ANSWER_MARKER)?;
    let (context, question) = body.rsplit_once(QUESTION_MARKER)?;
    Some((question, context))
}

/// Join tokenized prompt parts into at most `budget` ids, ending in `eos`.
///
/// Only the context is shortened; the instruction head and the question tail
/// are always kept whole, even when they alone exceed the budget.
pub fn fit_token_budget(head: &[u32], context: &[u32], tail: &[u32], eos: u32, budget: usize) -> Vec<u32> {
    let fixed = head.len() + tail.len() + 1;
    let keep = budget.saturating_sub(fixed).min(context.len());
    if keep < context.len() {
        tracing::warn!(context_tokens = context.len(), kept = keep, "context exceeds encoder budget, trimming its end");
    }
    let mut ids = Vec::with_capacity(fixed + keep);
    ids.extend_from_slice(head);
    ids.extend_from_slice(&context[..keep]);
    ids.extend_from_slice(tail);
    ids.push(eos);
    ids
}
