use std::cmp::Ordering;

use crate::corpus::Corpus;
use crate::models::RetrievalResult;

pub const DEFAULT_SIMILARITY_FLOOR: f32 = 0.5;
pub const DEFAULT_TOP_K: usize = 10;

/// Normalized dot product in [-1, 1]. Zero-magnitude vectors score 0.0
/// rather than NaN so they always fall below the similarity floor.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Linear-scan scorer over one or more corpora.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    similarity_floor: f32,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            similarity_floor: DEFAULT_SIMILARITY_FLOOR,
        }
    }
}

impl Retriever {
    pub fn new(similarity_floor: f32) -> Self {
        Self { similarity_floor }
    }

    /// Score every aligned entry of every corpus against `query`, drop
    /// results below the floor, and return the top `k` sorted by
    /// descending similarity. The sort is stable, so equal scores keep
    /// their scan order.
    pub fn retrieve(&self, query: &[f32], k: usize, corpora: &[&Corpus]) -> Vec<RetrievalResult> {
        let mut results = Vec::new();
        for corpus in corpora {
            for (chunk, embedding, url) in corpus.entries() {
                let similarity = cosine_similarity(query, embedding);
                if similarity >= self.similarity_floor {
                    results.push(RetrievalResult {
                        source: corpus.source.clone(),
                        url: url.to_string(),
                        text: chunk.to_string(),
                        similarity,
                    });
                }
            }
        }
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(k);
        results
    }
}
