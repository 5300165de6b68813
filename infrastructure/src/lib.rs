pub mod config;
pub mod corpus_store;
pub mod embedder;
pub mod gemini_client;
pub mod rate_limiter;
