use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error(
    "corpus '{name}' has misaligned parallel arrays: {chunks} chunks, {embeddings} embeddings, {urls} urls"
)]
pub struct CorpusIntegrityError {
    pub name: String,
    pub chunks: usize,
    pub embeddings: usize,
    pub urls: usize,
}

/// An aligned collection of chunk texts, their embedding vectors, and the
/// URLs they came from. Loaded once, read-only afterwards; the three
/// arrays stay index-aligned 1:1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    pub source: String,
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub urls: Vec<String>,
}

impl Corpus {
    pub fn new(
        source: impl Into<String>,
        chunks: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        urls: Vec<String>,
    ) -> Result<Self, CorpusIntegrityError> {
        let corpus = Self {
            source: source.into(),
            chunks,
            embeddings,
            urls,
        };
        corpus.validate()?;
        Ok(corpus)
    }

    /// Deserialization bypasses `new`, so loaders must re-check alignment.
    pub fn validate(&self) -> Result<(), CorpusIntegrityError> {
        if self.chunks.len() != self.embeddings.len() || self.chunks.len() != self.urls.len() {
            return Err(CorpusIntegrityError {
                name: self.source.clone(),
                chunks: self.chunks.len(),
                embeddings: self.embeddings.len(),
                urls: self.urls.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Aligned (chunk, embedding, url) triples in scan order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[f32], &str)> {
        self.chunks
            .iter()
            .zip(self.embeddings.iter())
            .zip(self.urls.iter())
            .map(|((chunk, embedding), url)| (chunk.as_str(), embedding.as_slice(), url.as_str()))
    }
}
