use std::sync::LazyLock;

use domain::corpus::Corpus;
use domain::models::{ParsedAnswer, RetrievalResult};
use domain::provider::{AnswerProvider, EmbeddingProvider, ImageDescriber};
use domain::response;
use domain::retrieval::Retriever;
use infrastructure::embedder::{EmbeddingClient, GenerationClient};
use regex::Regex;
use shared::types::Result;

// Lazy so the question text is scanned only when a service is in use.
static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://\S+?\.(?:png|jpe?g|gif|webp)(?:\?\S*)?")
        .expect("image url pattern")
});

/// Question-answering pipeline: optional image description, query
/// embedding, retrieval across the loaded corpora, prompt assembly,
/// generation, and tolerant parsing of the reply.
pub struct AnswerService<E, A, D> {
    embedder: EmbeddingClient<E>,
    generator: GenerationClient<A>,
    describer: D,
    retriever: Retriever,
    corpora: Vec<Corpus>,
    top_k: usize,
}

impl<E, A, D> AnswerService<E, A, D>
where
    E: EmbeddingProvider,
    A: AnswerProvider,
    D: ImageDescriber,
{
    pub fn new(
        embedder: EmbeddingClient<E>,
        generator: GenerationClient<A>,
        describer: D,
        retriever: Retriever,
        corpora: Vec<Corpus>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            describer,
            retriever,
            corpora,
            top_k,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<ParsedAnswer> {
        let query_text = self.expand_with_image(question).await;

        eprintln!("Embedding the question...");
        let query = self.embedder.embed(&query_text).await?;

        let corpora: Vec<&Corpus> = self.corpora.iter().collect();
        let results = self.retriever.retrieve(&query, self.top_k, &corpora);
        eprintln!("Retrieved {} relevant passage(s)", results.len());

        let prompt = build_prompt(&query_text, &results);
        eprintln!("Generating the answer...");
        let reply = self.generator.generate(&prompt).await?;

        Ok(response::parse(&reply))
    }

    /// If the question references an image, fold a textual description
    /// of it into the query. Description failures are reported and
    /// ignored; the question still gets answered from its text alone.
    async fn expand_with_image(&self, question: &str) -> String {
        let Some(url) = find_image_url(question) else {
            return question.to_string();
        };
        eprintln!("Describing referenced image {url}...");
        match self.describer.describe(url, question).await {
            Ok(description) => format!("{question}\n\nImage description: {description}"),
            Err(err) => {
                eprintln!("Image description failed ({err}), continuing without it");
                question.to_string()
            }
        }
    }
}

fn find_image_url(question: &str) -> Option<&str> {
    IMAGE_URL.find(question).map(|m| m.as_str())
}

fn build_prompt(question: &str, results: &[RetrievalResult]) -> String {
    let mut prompt = String::from(
        "Answer the question using only the numbered context passages below. \
         If the context is not sufficient, say so.\n\n",
    );
    if results.is_empty() {
        prompt.push_str("(no relevant context was found)\n");
    }
    for (i, result) in results.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] (from {}, {})\n{}\n\n",
            i + 1,
            result.source,
            result.url,
            result.text
        ));
    }
    prompt.push_str(&format!(
        "Question: {question}\n\n\
         End the reply with a line `Sources:` followed by one line per cited \
         passage in the form `URL: [the url] Text: [a short label]`. Cite only \
         passages you actually used.",
    ));
    prompt
}
