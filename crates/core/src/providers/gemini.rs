//! Google Gemini `embedContent` and `generateContent` clients.

use super::{ProviderConfig, GENERATION_MAX_TOKENS, GENERATION_TEMPERATURE};
use crate::error::ProviderError;
use crate::traits::{Embedder, Generator};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const BACKEND: &str = "gemini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";
pub const EMBEDDING_DIMENSION: usize = 768;

fn build_client(config: &ProviderConfig) -> Result<Client, ProviderError> {
    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(ProviderError::MissingCredentials("Gemini (GEMINI_API_KEY)".to_string()));
    }

    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(api_key)
        .map_err(|_| ProviderError::MissingCredentials("Gemini: malformed api key".to_string()))?;
    headers.insert("x-goog-api-key", key);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .timeout(config.timeout)
        .default_headers(headers)
        .build()?)
}

async fn post_json<T: for<'de> Deserialize<'de>>(
    client: &Client,
    endpoint: &str,
    body: &serde_json::Value,
) -> Result<T, ProviderError> {
    let response = client.post(endpoint).json(body).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(ProviderError::BackendResponse {
            backend: BACKEND.to_string(),
            details: format!("{status}: {text}"),
        });
    }
    Ok(response.json().await?)
}

#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.endpoint(&format!("models/{}:embedContent", config.model)),
            model: config.model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });
        let parsed: EmbedContentResponse = post_json(&self.client, &self.endpoint, &body).await?;
        Ok(parsed.embedding.values)
    }

    /// The endpoint embeds one text per request.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_one(text).await?);
        }
        Ok(embeddings)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiChat {
    client: Client,
    endpoint: String,
}

impl GeminiChat {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.endpoint(&format!("models/{}:generateContent", config.model)),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Generator for GeminiChat {
    /// Gemini takes a single prompt, so the system instructions are prepended.
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": format!("{system}\n\n{user}") }] }],
            "generationConfig": {
                "temperature": GENERATION_TEMPERATURE,
                "maxOutputTokens": GENERATION_MAX_TOKENS,
            },
        });
        let parsed: GenerateContentResponse = post_json(&self.client, &self.endpoint, &body).await?;

        let answer = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(ProviderError::EmptyResponse(BACKEND.to_string()));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;

    fn config(base_url: &str, model: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            ..ProviderConfig::gemini("g-test", model)
        }
    }

    #[tokio::test]
    async fn embed_many_sends_one_request_per_text() {
        let server = StubServer::spawn(|_| (200, r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#.to_string())).await;
        let embedder = GeminiEmbedder::new(&config(&server.base_url, DEFAULT_EMBEDDING_MODEL))
            .expect("client builds");

        let vectors = embedder
            .embed_many(&["a".to_string(), "b".to_string()])
            .await
            .expect("embeddings");

        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3]; 2]);
        assert_eq!(
            server.routes(),
            vec!["POST /models/text-embedding-004:embedContent".to_string(); 2]
        );
    }

    #[tokio::test]
    async fn generate_joins_candidate_parts() {
        let server = StubServer::spawn(|_| {
            (
                200,
                r#"{"candidates":[{"content":{"parts":[{"text":"Transformers "},{"text":"use attention."}]}}]}"#
                    .to_string(),
            )
        })
        .await;
        let chat = GeminiChat::new(&config(&server.base_url, DEFAULT_CHAT_MODEL)).expect("client builds");

        let answer = chat.generate("Be brief.", "What?").await.expect("answer");

        assert_eq!(answer, "Transformers use attention.");
        let body: serde_json::Value =
            serde_json::from_str(&server.requests()[0].body).expect("json body");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Be brief.\n\nWhat?");
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let server = StubServer::spawn(|_| (200, r#"{"candidates":[]}"#.to_string())).await;
        let chat = GeminiChat::new(&config(&server.base_url, DEFAULT_CHAT_MODEL)).expect("client builds");

        assert!(matches!(
            chat.generate("s", "u").await,
            Err(ProviderError::EmptyResponse(_))
        ));
    }
}
