use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use domain::provider::{AnswerProvider, EmbeddingProvider, ImageDescriber, ProviderError};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

/// Gemini REST provider for embeddings, answer generation, and image
/// description. Failures are classified into `ProviderError` variants at
/// this boundary so the retry policy upstream never parses error text.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    embed_model: String,
    answer_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        embed_model: impl Into<String>,
        answer_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            embed_model: embed_model.into(),
            answer_model: answer_model.into(),
        }
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, action, self.api_key
        )
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<R, ProviderError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::Transient(format!("request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }
        response
            .json::<R>()
            .await
            .map_err(|err| ProviderError::Transient(format!("malformed provider response: {err}")))
    }

    async fn generate_from(&self, contents: Vec<Content>) -> Result<String, ProviderError> {
        let url = self.model_url(&self.answer_model, "generateContent");
        let response: GenerateResponse = self.post(url, &GenerateRequest { contents }).await?;
        let mut text = String::new();
        for candidate in response.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(part_text) = part.text {
                        text.push_str(&part_text);
                    }
                }
            }
        }
        Ok(text)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = self.model_url(&self.embed_model, "embedContent");
        let request = EmbedRequest {
            model: format!("models/{}", self.embed_model),
            content: Content::text(text),
        };
        let response: EmbedResponse = self.post(url, &request).await?;
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl AnswerProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate_from(vec![Content::text(prompt)]).await
    }
}

#[async_trait]
impl ImageDescriber for GeminiClient {
    async fn describe(&self, image_url: &str, question: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|err| ProviderError::Transient(format!("image download failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_http_failure(status, "image download rejected"));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ProviderError::Transient(format!("image download failed: {err}")))?;

        let contents = vec![Content {
            parts: vec![
                Part {
                    text: Some(format!(
                        "Describe this image so the description can stand in for it \
                         when answering the question: {question}"
                    )),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_for_url(image_url).to_string(),
                        data: BASE64.encode(&bytes),
                    }),
                },
            ],
        }];
        self.generate_from(contents).await
    }
}

/// Map an HTTP failure onto the provider error taxonomy. Some gateways
/// report quota exhaustion with a 200-family proxy status or a generic
/// 400, so the body is scanned for quota wording as well.
pub fn classify_http_failure(status: StatusCode, body: &str) -> ProviderError {
    let message = format!("{status}: {body}");
    let lowered = body.to_lowercase();
    if status == StatusCode::TOO_MANY_REQUESTS
        || lowered.contains("rate limit")
        || lowered.contains("quota")
        || lowered.contains("resource_exhausted")
    {
        return ProviderError::RateLimited(message);
    }
    if matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    ) {
        return ProviderError::Fatal(message);
    }
    ProviderError::Transient(message)
}

fn mime_for_url(url: &str) -> &'static str {
    let lowered = url.to_lowercase();
    let path = lowered.split(['?', '#']).next().unwrap_or(&lowered);
    if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}
