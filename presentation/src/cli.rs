use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use application::answer_service::AnswerService;
use application::index_service::{IndexService, SourceDocument};
use clap::Parser;
use colored::Colorize;
use dialoguer::Input;
use domain::models::ParsedAnswer;
use domain::retrieval::Retriever;
use infrastructure::config::Config;
use infrastructure::corpus_store::CorpusStore;
use infrastructure::embedder::{EmbeddingClient, GenerationClient};
use infrastructure::gemini_client::GeminiClient;
use infrastructure::rate_limiter::RateLimiter;
use shared::telemetry::Telemetry;
use shared::types::Result;

#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Question answering over indexed documentation corpora"
)]
pub struct Cli {
    /// The question to answer; prompts interactively when omitted.
    #[arg(trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Index the markdown files under this directory instead of answering.
    #[arg(long, value_name = "DIR")]
    pub index: Option<PathBuf>,

    /// Corpus name to index into (its file becomes `<name>.json`).
    #[arg(long, default_value = "markdown")]
    pub source: String,

    /// Image URL to describe and fold into the question.
    #[arg(long)]
    pub image: Option<String>,

    /// File the parsed answer is written to as JSON.
    #[arg(long, default_value = "response.json")]
    pub output: PathBuf,
}

pub struct CliApp;

impl CliApp {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        let config = Config::load()?;
        let client = GeminiClient::new(
            &config.api_key,
            &config.embed_model,
            &config.answer_model,
            &config.base_url,
        );
        let limiter = Arc::new(RateLimiter::new(
            config.requests_per_second,
            config.requests_per_minute,
        ));
        let embedder = EmbeddingClient::new(client.clone(), Arc::clone(&limiter), config.max_tries);
        let store = CorpusStore::new(&config.corpus_dir);

        if let Some(dir) = &cli.index {
            return index_directory(&cli, &config, embedder, store, dir).await;
        }

        let mut telemetry = Telemetry::new();
        let typed = if cli.question.is_empty() {
            Input::<String>::new()
                .with_prompt("Question")
                .interact_text()?
        } else {
            cli.question.join(" ")
        };
        let question = compose_question(typed, cli.image.as_deref());

        let mut corpora = Vec::new();
        for source in &config.corpus_sources {
            match store.load(source) {
                Ok(corpus) => {
                    eprintln!("Loaded {} passage(s) from {source}", corpus.len());
                    corpora.push(corpus);
                }
                Err(err) => eprintln!("Skipping corpus {source}: {err:#}"),
            }
        }
        if corpora.is_empty() {
            bail!(
                "no corpora could be loaded from {} (run with --index first?)",
                config.corpus_dir
            );
        }
        telemetry.mark("load corpora");

        let generator = GenerationClient::new(client.clone(), Arc::clone(&limiter), config.max_tries);
        let service = AnswerService::new(
            embedder,
            generator,
            client,
            Retriever::new(config.similarity_floor),
            corpora,
            config.top_k,
        );
        let parsed = service.answer(&question).await?;
        telemetry.mark("answer");

        print_answer(&parsed);
        write_output(&cli.output, &parsed)?;
        telemetry.mark("report");

        for (label, duration) in telemetry.phases() {
            eprintln!("{label}: {duration:.2?}");
        }
        eprintln!("total: {:.2?}", telemetry.elapsed());
        Ok(())
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold an explicit `--image` URL into the question text so the image
/// detection in the answer pipeline picks it up.
fn compose_question(typed: String, image: Option<&str>) -> String {
    match image {
        Some(url) => format!("{typed} {url}"),
        None => typed,
    }
}

async fn index_directory(
    cli: &Cli,
    config: &Config,
    embedder: EmbeddingClient<GeminiClient>,
    store: CorpusStore,
    dir: &Path,
) -> Result<()> {
    let documents = collect_markdown(dir)?;
    if documents.is_empty() {
        bail!("no markdown files found under {}", dir.display());
    }
    let service = IndexService::new(embedder, store, config.chunking);
    service.index(&cli.source, &documents).await?;
    Ok(())
}

fn collect_markdown(dir: &Path) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("cannot read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            documents.extend(collect_markdown(&path)?);
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let url = original_url(&text).unwrap_or_else(|| path.display().to_string());
        documents.push(SourceDocument { url, text });
    }
    documents.sort_by(|a, b| a.url.cmp(&b.url));
    Ok(documents)
}

/// Pull `original_url:` out of a leading `---` frontmatter block, so
/// exported pages cite their canonical location rather than a local path.
fn original_url(text: &str) -> Option<String> {
    let rest = text.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    for line in rest[..end].lines() {
        if let Some(value) = line.trim().strip_prefix("original_url:") {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn print_answer(parsed: &ParsedAnswer) {
    println!("{}", parsed.answer.green());
    if !parsed.links.is_empty() {
        println!("\n{}", "Sources:".bold());
        for link in &parsed.links {
            println!("  {} {}", link.text.cyan(), link.url);
        }
    }
}

fn write_output(path: &Path, parsed: &ParsedAnswer) -> Result<()> {
    let json = serde_json::to_string_pretty(parsed)?;
    fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
