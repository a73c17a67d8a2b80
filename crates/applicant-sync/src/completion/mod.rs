//! Prompt-in / text-out language model access.

mod openai;
mod retry;

pub use openai::OpenAiClient;
pub use retry::{call_with_retry, RetryError, RetryPolicy};

/// A text completion backend.
pub trait TextCompletion: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Failure of a single completion call, classified for the retry policy.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Rate limits, server errors and transport hiccups.
    #[error("transient completion error: {0}")]
    Transient(String),
    #[error("completion failed: {0}")]
    Fatal(String),
}

impl CompletionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CompletionError::Transient(_))
    }
}
