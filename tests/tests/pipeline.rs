use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use application::answer_service::AnswerService;
use application::index_service::{IndexService, SourceDocument};
use domain::chunker::ChunkConfig;
use domain::retrieval::Retriever;
use infrastructure::corpus_store::CorpusStore;
use infrastructure::embedder::{EmbeddingClient, GenerationClient};
use infrastructure::rate_limiter::RateLimiter;
use tests::{CannedAnswer, KeywordEmbedder, NoImages};

const KEYWORDS: [&str; 3] = ["cat", "dog", "bird"];

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("docqa-pipeline-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn embedding_client() -> EmbeddingClient<KeywordEmbedder> {
    let limiter = Arc::new(RateLimiter::new(1000, 100_000));
    EmbeddingClient::new(KeywordEmbedder::new(&KEYWORDS), limiter, 1)
}

fn documents() -> Vec<SourceDocument> {
    vec![
        SourceDocument {
            url: "http://pets.example/cats".to_string(),
            text: "A cat purrs when content. The cat sleeps most of the day.".to_string(),
        },
        SourceDocument {
            url: "http://pets.example/dogs".to_string(),
            text: "A dog barks at strangers. The dog loves long walks.".to_string(),
        },
    ]
}

#[tokio::test]
async fn index_persist_load_answer_round_trip() {
    let dir = temp_dir("round-trip");
    let indexer = IndexService::new(
        embedding_client(),
        CorpusStore::new(&dir),
        ChunkConfig::default(),
    );
    indexer.index("markdown", &documents()).await.unwrap();

    let corpus = CorpusStore::new(&dir).load("markdown").unwrap();
    assert_eq!(corpus.source, "markdown");
    assert_eq!(corpus.len(), 2);

    let reply = "Cats purr when they are content.\n\
                 Sources:\n\
                 1. URL: [http://pets.example/cats] Text: [Cat guide]";
    let generator = GenerationClient::new(
        CannedAnswer::new(reply),
        Arc::new(RateLimiter::new(1000, 100_000)),
        1,
    );
    let service = AnswerService::new(
        embedding_client(),
        generator,
        NoImages,
        Retriever::default(),
        vec![corpus],
        10,
    );

    let parsed = service.answer("Tell me about a cat").await.unwrap();
    assert_eq!(parsed.answer, "Cats purr when they are content.");
    assert_eq!(parsed.links.len(), 1);
    assert_eq!(parsed.links[0].url, "http://pets.example/cats");
    assert_eq!(parsed.links[0].text, "Cat guide");
}

#[tokio::test]
async fn prompt_contains_only_relevant_passages() {
    let dir = temp_dir("relevance");
    let indexer = IndexService::new(
        embedding_client(),
        CorpusStore::new(&dir),
        ChunkConfig::default(),
    );
    let corpus = indexer.index("markdown", &documents()).await.unwrap();

    let canned = CannedAnswer::new("Dogs bark.");
    let generator = GenerationClient::new(
        canned.clone(),
        Arc::new(RateLimiter::new(1000, 100_000)),
        1,
    );
    let service = AnswerService::new(
        embedding_client(),
        generator,
        NoImages,
        Retriever::default(),
        vec![corpus],
        10,
    );
    service.answer("Why does my dog bark?").await.unwrap();

    let prompts = canned.prompts();
    assert_eq!(prompts.len(), 1);
    // Only the dog passage clears the similarity floor for this question.
    assert!(prompts[0].contains("http://pets.example/dogs"));
    assert!(!prompts[0].contains("http://pets.example/cats"));
    assert!(prompts[0].contains("Why does my dog bark?"));
}

#[tokio::test]
async fn unparseable_reply_degrades_to_the_fallback_answer() {
    let dir = temp_dir("fallback");
    let indexer = IndexService::new(
        embedding_client(),
        CorpusStore::new(&dir),
        ChunkConfig::default(),
    );
    let corpus = indexer.index("markdown", &documents()).await.unwrap();

    let generator = GenerationClient::new(
        CannedAnswer::new("An answer with no source section at all."),
        Arc::new(RateLimiter::new(1000, 100_000)),
        1,
    );
    let service = AnswerService::new(
        embedding_client(),
        generator,
        NoImages,
        Retriever::default(),
        vec![corpus],
        10,
    );
    let parsed = service.answer("Tell me about a cat").await.unwrap();
    // No sources heading means an answer with zero citations, not an error.
    assert_eq!(parsed.answer, "An answer with no source section at all.");
    assert!(parsed.links.is_empty());
}

#[tokio::test]
async fn parsed_answer_serializes_to_the_documented_shape() {
    let parsed = domain::response::parse(
        "The answer.\nSources:\n1. URL: [http://a.com] Text: [Label]",
    );
    let value = serde_json::to_value(&parsed).unwrap();
    assert_eq!(value["answer"], "The answer.");
    assert_eq!(value["links"][0]["url"], "http://a.com");
    assert_eq!(value["links"][0]["text"], "Label");
}
