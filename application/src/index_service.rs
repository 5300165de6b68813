use domain::chunker::{chunk, ChunkConfig};
use domain::corpus::Corpus;
use domain::provider::EmbeddingProvider;
use infrastructure::corpus_store::CorpusStore;
use infrastructure::embedder::EmbeddingClient;
use rayon::prelude::*;
use shared::types::Result;

/// One document to index: where it came from and its full text.
pub struct SourceDocument {
    pub url: String,
    pub text: String,
}

/// Builds a corpus from raw documents: chunk in parallel, embed every
/// chunk through the rate-limited client, persist as one JSON file.
pub struct IndexService<E> {
    embedder: EmbeddingClient<E>,
    store: CorpusStore,
    chunking: ChunkConfig,
}

impl<E: EmbeddingProvider> IndexService<E> {
    pub fn new(embedder: EmbeddingClient<E>, store: CorpusStore, chunking: ChunkConfig) -> Self {
        Self {
            embedder,
            store,
            chunking,
        }
    }

    pub async fn index(&self, source: &str, documents: &[SourceDocument]) -> Result<Corpus> {
        self.chunking.validate()?;
        eprintln!("Chunking {} document(s)...", documents.len());
        let chunked: Vec<Vec<String>> = documents
            .par_iter()
            .map(|doc| chunk(&doc.text, &self.chunking))
            .collect::<Result<_, _>>()?;

        let mut chunks = Vec::new();
        let mut urls = Vec::new();
        for (doc, doc_chunks) in documents.iter().zip(chunked) {
            for piece in doc_chunks {
                chunks.push(piece);
                urls.push(doc.url.clone());
            }
        }

        eprintln!("Embedding {} chunk(s)...", chunks.len());
        let embeddings = self.embedder.embed_batch(&chunks).await?;

        let corpus = Corpus::new(source, chunks, embeddings, urls)?;
        self.store.save(&corpus)?;
        eprintln!(
            "Indexed {} chunk(s) into {}",
            corpus.len(),
            self.store.path_for(source).display()
        );
        Ok(corpus)
    }
}
