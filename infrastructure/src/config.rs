use std::env;
use std::str::FromStr;

use anyhow::Context;
use domain::chunker::ChunkConfig;
use dotenvy::dotenv;
use shared::types::Result;

use crate::embedder::DEFAULT_MAX_TRIES;
use crate::gemini_client::DEFAULT_BASE_URL;

/// Runtime configuration, read once at startup from the environment
/// (with `.env` support). Only the API key is mandatory.
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub embed_model: String,
    pub answer_model: String,
    pub corpus_dir: String,
    pub corpus_sources: Vec<String>,
    pub requests_per_second: u32,
    pub requests_per_minute: u32,
    pub max_tries: u32,
    pub top_k: usize,
    pub similarity_floor: f32,
    pub chunking: ChunkConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();
        let api_key = env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY is not set (put it in the environment or a .env file)")?;
        let chunking = ChunkConfig {
            target_size: parse_or("CHUNK_TARGET_SIZE", ChunkConfig::default().target_size)?,
            overlap: parse_or("CHUNK_OVERLAP", ChunkConfig::default().overlap)?,
            hard_limit: parse_or("CHUNK_HARD_LIMIT", ChunkConfig::default().hard_limit)?,
        };
        chunking.validate()?;
        Ok(Self {
            api_key,
            base_url: env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            embed_model: env_or("GEMINI_EMBED_MODEL", "gemini-embedding-exp-03-07"),
            answer_model: env_or("GEMINI_ANSWER_MODEL", "gemini-2.0-flash"),
            corpus_dir: env_or("CORPUS_DIR", "embeddings"),
            corpus_sources: env_or("CORPUS_SOURCES", "discourse,markdown")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            requests_per_second: parse_or("REQUESTS_PER_SECOND", 2)?,
            requests_per_minute: parse_or("REQUESTS_PER_MINUTE", 60)?,
            max_tries: parse_or("MAX_TRIES", DEFAULT_MAX_TRIES)?,
            top_k: parse_or("TOP_K", domain::retrieval::DEFAULT_TOP_K)?,
            similarity_floor: parse_or(
                "SIMILARITY_FLOOR",
                domain::retrieval::DEFAULT_SIMILARITY_FLOOR,
            )?,
            chunking,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
