use async_trait::async_trait;
use thiserror::Error;

/// Failure classification for the external embedding/completion provider.
/// The HTTP adapter maps raw responses onto these variants so retry
/// policy never inspects error text itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Quota or rate-limit rejection; worth backing off for.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Server hiccup, timeout, or network failure; worth a quick retry.
    #[error("transient provider failure: {0}")]
    Transient(String),
    /// Misconfiguration (bad key, unknown model); retrying cannot help.
    #[error("fatal provider failure: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Raised after the embedding retry budget is spent; carries the last
/// underlying cause. Callers must surface it, never coerce it into an
/// empty vector.
#[derive(Debug, Error)]
#[error("embedding failed after {attempts} attempt(s)")]
pub struct EmbeddingError {
    pub attempts: u32,
    #[source]
    pub source: ProviderError,
}

/// Same shape for the answer-generation call.
#[derive(Debug, Error)]
#[error("answer generation failed after {attempts} attempt(s)")]
pub struct GenerationError {
    pub attempts: u32,
    #[source]
    pub source: ProviderError,
}

/// Text to embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Prompt to raw model reply.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Image URL to a textual description, folded into the query text before
/// embedding when a question references an image.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image_url: &str, question: &str) -> Result<String, ProviderError>;
}
