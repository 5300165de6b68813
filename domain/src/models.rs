use serde::{Deserialize, Serialize};

/// One corpus entry that survived the similarity floor, tagged with the
/// corpus it came from. Ephemeral; built fresh for every query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub source: String,
    pub url: String,
    pub text: String,
    pub similarity: f32,
}

/// A (url, label) pair extracted from the model's source list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub text: String,
}

/// Final structured result: free-text answer plus cited links, serialized
/// as `{ "answer": ..., "links": [{"url": ..., "text": ...}] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedAnswer {
    pub answer: String,
    pub links: Vec<Citation>,
}
