//! Text generation capability used to turn a prompt into an answer.

use async_trait::async_trait;

use crate::error::Result;

/// A backend that turns a prompt into generated text.
///
/// Failures (network, quota, model errors) are reported as
/// [`RagError::GenerationError`](crate::RagError::GenerationError); the
/// pipeline converts them into a user-visible answer string.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Return the model name, for logs.
    fn name(&self) -> &str;
}
