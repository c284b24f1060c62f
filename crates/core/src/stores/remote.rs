use crate::error::StoreError;
use crate::models::{ChunkMetadata, SearchHit};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

const BACKEND: &str = "remote-index";

#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    pub base_url: String,
    pub health_timeout: Duration,
    /// Used for collection create/delete.
    pub admin_timeout: Duration,
    pub insert_timeout: Duration,
    pub search_timeout: Duration,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            health_timeout: Duration::from_secs(2),
            admin_timeout: Duration::from_secs(5),
            insert_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(10),
        }
    }
}

/// JSON-over-HTTP client for the remote vector indexing service.
#[derive(Debug, Clone)]
pub struct RemoteIndexClient {
    endpoint: String,
    client: Client,
    config: RemoteStoreConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl RemoteIndexClient {
    pub fn new(config: RemoteStoreConfig) -> Result<Self, StoreError> {
        let parsed = Url::parse(&config.base_url)?;
        Ok(Self {
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            client: Client::new(),
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn health(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .get(format!("{}/health", self.endpoint))
            .timeout(self.config.health_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(StoreError::RemoteUnavailable(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn create_collection(&self, name: &str, dimension: usize) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!("{}/collections", self.endpoint))
            .timeout(self.config.admin_timeout)
            .json(&json!({
                "name": name,
                "dimension": dimension,
                "metric": "cosine",
            }))
            .send()
            .await?;

        ensure_success(response).await.map(drop)
    }

    pub async fn insert(
        &self,
        collection: &str,
        vectors: &[Vec<f32>],
        metadata: &[ChunkMetadata],
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!("{}/vectors/insert", self.endpoint))
            .timeout(self.config.insert_timeout)
            .json(&json!({
                "collection": collection,
                "vectors": vectors,
                "metadata": metadata,
            }))
            .send()
            .await?;

        ensure_success(response).await.map(drop)
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let response = self
            .client
            .post(format!("{}/vectors/search", self.endpoint))
            .timeout(self.config.search_timeout)
            .json(&json!({
                "collection": collection,
                "query": query,
                "top_k": top_k,
                "threshold": threshold,
            }))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.results)
    }

    pub async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(format!("{}/collections/{}", self.endpoint, name))
            .timeout(self.config.admin_timeout)
            .send()
            .await?;

        ensure_success(response).await.map(drop)
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        details: format!("{status}: {body}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;

    fn client(base_url: &str) -> RemoteIndexClient {
        RemoteIndexClient::new(RemoteStoreConfig {
            base_url: base_url.to_string(),
            ..RemoteStoreConfig::default()
        })
        .expect("valid url")
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = RemoteIndexClient::new(RemoteStoreConfig {
            base_url: "not a url".to_string(),
            ..RemoteStoreConfig::default()
        });
        assert!(matches!(result, Err(StoreError::Url(_))));
    }

    #[tokio::test]
    async fn search_parses_results_and_sends_contract_fields() {
        let server = StubServer::spawn(|route| match route {
            "POST /vectors/search" => (
                200,
                r#"{"results":[{"metadata":{"text":"We study X.","paper_name":"p","section_name":"Introduction","page_number":2,"chunk_index":4},"similarity":0.91}]}"#
                    .to_string(),
            ),
            _ => (404, String::new()),
        })
        .await;

        let hits = client(&server.base_url)
            .search("research_papers", &[0.5, 0.5], 3, 0.2)
            .await
            .expect("search succeeds");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.chunk_index, 4);
        assert!((hits[0].similarity - 0.91).abs() < 1e-6);

        let requests = server.requests();
        let body: serde_json::Value =
            serde_json::from_str(&requests[0].body).expect("json request body");
        assert_eq!(body["collection"], "research_papers");
        assert_eq!(body["top_k"], 3);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = StubServer::spawn(|_| (503, "busy".to_string())).await;
        let client = client(&server.base_url);

        assert!(client.health().await.is_err());
        assert!(matches!(
            client.create_collection("c", 8).await,
            Err(StoreError::BackendResponse { .. })
        ));
    }
}
