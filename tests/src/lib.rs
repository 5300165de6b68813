//! Deterministic provider stubs shared by the integration tests.

use async_trait::async_trait;
use domain::provider::{AnswerProvider, EmbeddingProvider, ImageDescriber, ProviderError};

/// Embeds text as keyword-presence indicators: one dimension per keyword,
/// 1.0 when the lowercased text contains it. Texts sharing keywords score
/// high cosine similarity, unrelated texts score 0.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let lowered = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .map(|k| if lowered.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect())
    }
}

/// Replies with a fixed canned string regardless of the prompt. Clones
/// share the prompt log, so a test can keep a handle and inspect what
/// the pipeline actually sent.
#[derive(Clone)]
pub struct CannedAnswer {
    reply: String,
    prompts: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl CannedAnswer {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: std::sync::Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerProvider for CannedAnswer {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Describer for question flows that never reference an image.
pub struct NoImages;

#[async_trait]
impl ImageDescriber for NoImages {
    async fn describe(&self, _image_url: &str, _question: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Fatal("image description not available".into()))
    }
}
