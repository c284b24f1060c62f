use crate::error::StoreError;
use crate::models::{ChunkMetadata, SearchHit};
use crate::similarity::MemoryIndex;
use crate::stores::{RemoteIndexClient, RemoteStoreConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Remote,
    LocalFallback,
}

/// What happens to the mode after a remote call fails at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// The first failed remote call switches the store to `LocalFallback`
    /// for the rest of its lifetime.
    #[default]
    Sticky,
    /// Every call tries the remote index first; only the failing call is
    /// served locally.
    RetryRemote,
}

/// Insert/search facade over the remote index with an in-memory fallback.
///
/// Remote insert and search failures are never returned to the caller: the
/// operation completes on the local [`MemoryIndex`] instead. Collection
/// create/delete failures are logged and leave the mode alone. The only hard
/// error is [`StoreError::InputMismatch`]. There is no transition back to
/// `Remote`.
#[derive(Debug)]
pub struct RetrievalStore {
    remote: Option<RemoteIndexClient>,
    remote_active: AtomicBool,
    policy: FallbackPolicy,
    local: MemoryIndex,
}

impl RetrievalStore {
    /// Probes `GET /health` once; any failure starts the store in
    /// `LocalFallback`.
    pub async fn connect(config: RemoteStoreConfig, policy: FallbackPolicy) -> Self {
        let client = match RemoteIndexClient::new(config.clone()) {
            Ok(client) => client,
            Err(error) => {
                warn!(url = %config.base_url, %error, "invalid remote index url, using in-memory fallback store");
                return Self::local_only();
            }
        };

        match client.health().await {
            Ok(()) => {
                info!(url = %client.endpoint(), ?policy, "connected to remote index");
                Self {
                    remote: Some(client),
                    remote_active: AtomicBool::new(true),
                    policy,
                    local: MemoryIndex::new(),
                }
            }
            Err(error) => {
                warn!(
                    url = %client.endpoint(),
                    %error,
                    "cannot reach remote index, using in-memory fallback store (data will not persist)"
                );
                Self::local_only()
            }
        }
    }

    pub fn local_only() -> Self {
        Self {
            remote: None,
            remote_active: AtomicBool::new(false),
            policy: FallbackPolicy::Sticky,
            local: MemoryIndex::new(),
        }
    }

    pub fn mode(&self) -> StoreMode {
        if self.active_remote().is_some() {
            StoreMode::Remote
        } else {
            StoreMode::LocalFallback
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Number of records held by the in-memory index.
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// A rejected create (commonly "already exists") does not affect the mode.
    pub async fn create_collection(&self, name: &str, dimension: usize) {
        match self.active_remote() {
            Some(remote) => {
                if let Err(error) = remote.create_collection(name, dimension).await {
                    warn!(collection = name, %error, "remote create_collection failed");
                }
            }
            None => debug!(collection = name, dimension, "created in-memory collection"),
        }
    }

    pub async fn insert_vectors(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<(), StoreError> {
        if vectors.len() != metadata.len() {
            return Err(StoreError::InputMismatch {
                vectors: vectors.len(),
                metadata: metadata.len(),
            });
        }

        if let Some(remote) = self.active_remote() {
            match remote.insert(collection, &vectors, &metadata).await {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade("insert_vectors", &error),
            }
        }

        self.local.insert(vectors, metadata)
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Vec<SearchHit> {
        if let Some(remote) = self.active_remote() {
            match remote.search(collection, query, top_k, threshold).await {
                Ok(hits) => return hits,
                Err(error) => self.degrade("search", &error),
            }
        }

        self.local.search(query, top_k, threshold)
    }

    /// Always clears the local index, since failed remote inserts may have
    /// landed there.
    pub async fn delete_collection(&self, collection: &str) {
        self.local.delete_all();

        if let Some(remote) = self.active_remote() {
            if let Err(error) = remote.delete_collection(collection).await {
                warn!(collection, %error, "remote delete_collection failed");
            }
        }
    }

    fn active_remote(&self) -> Option<&RemoteIndexClient> {
        self.remote
            .as_ref()
            .filter(|_| self.remote_active.load(Ordering::Acquire))
    }

    fn degrade(&self, operation: &str, error: &StoreError) {
        match self.policy {
            FallbackPolicy::Sticky => {
                self.remote_active.store(false, Ordering::Release);
                warn!(operation, %error, "remote index failed, switching to in-memory fallback");
            }
            FallbackPolicy::RetryRemote => {
                warn!(operation, %error, "remote index failed, serving this call from in-memory fallback");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use std::time::Duration;

    fn metadata(index: u64) -> ChunkMetadata {
        ChunkMetadata {
            text: format!("chunk {index}"),
            paper_name: "paper".to_string(),
            section_name: "Methodology".to_string(),
            page_number: 3,
            chunk_index: index,
        }
    }

    fn config(base_url: &str) -> RemoteStoreConfig {
        RemoteStoreConfig {
            base_url: base_url.to_string(),
            health_timeout: Duration::from_millis(500),
            ..RemoteStoreConfig::default()
        }
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_and_serves_locally() {
        let store = RetrievalStore::connect(config("http://127.0.0.1:1"), FallbackPolicy::Sticky).await;
        assert_eq!(store.mode(), StoreMode::LocalFallback);

        let vector = vec![0.25, -0.5, 0.75];
        store
            .insert_vectors("research_papers", vec![vector.clone()], vec![metadata(0)])
            .await
            .expect("aligned insert");

        let hits = store.search("research_papers", &vector, 5, 0.0).await;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].similarity, 1.0);
        assert_eq!(hits[0].metadata, metadata(0));
    }

    #[tokio::test]
    async fn empty_store_search_is_empty() {
        let store = RetrievalStore::local_only();
        assert!(store.search("research_papers", &[1.0, 0.0], 5, 0.0).await.is_empty());
    }

    #[tokio::test]
    async fn mismatched_insert_fails_without_touching_anything() {
        let server = StubServer::spawn(|_| (200, "{}".to_string())).await;
        let store = RetrievalStore::connect(config(&server.base_url), FallbackPolicy::Sticky).await;

        let result = store
            .insert_vectors("research_papers", vec![vec![1.0], vec![2.0]], vec![metadata(0)])
            .await;

        assert!(matches!(result, Err(StoreError::InputMismatch { .. })));
        assert_eq!(store.local_len(), 0);
        assert_eq!(server.routes(), vec!["GET /health".to_string()]);
    }

    #[tokio::test]
    async fn non_ok_health_starts_in_fallback() {
        let server = StubServer::spawn(|_| (500, String::new())).await;
        let store = RetrievalStore::connect(config(&server.base_url), FallbackPolicy::Sticky).await;
        assert_eq!(store.mode(), StoreMode::LocalFallback);
    }

    #[tokio::test]
    async fn healthy_remote_handles_insert_and_search() {
        let server = StubServer::spawn(|route| match route {
            "POST /vectors/search" => (
                200,
                r#"{"results":[{"metadata":{"text":"remote","paper_name":"p","section_name":"Results","page_number":1,"chunk_index":0},"similarity":0.8}]}"#
                    .to_string(),
            ),
            _ => (200, "{}".to_string()),
        })
        .await;
        let store = RetrievalStore::connect(config(&server.base_url), FallbackPolicy::Sticky).await;
        assert_eq!(store.mode(), StoreMode::Remote);

        store.create_collection("research_papers", 2).await;
        store
            .insert_vectors("research_papers", vec![vec![1.0, 0.0]], vec![metadata(0)])
            .await
            .expect("aligned insert");
        let hits = store.search("research_papers", &[1.0, 0.0], 5, 0.0).await;

        assert_eq!(store.mode(), StoreMode::Remote);
        assert_eq!(store.local_len(), 0);
        assert_eq!(hits[0].metadata.text, "remote");
        assert_eq!(
            server.routes(),
            vec![
                "GET /health".to_string(),
                "POST /collections".to_string(),
                "POST /vectors/insert".to_string(),
                "POST /vectors/search".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn sticky_policy_switches_to_local_after_first_failure() {
        let server = StubServer::spawn(|route| match route {
            "GET /health" => (200, "{}".to_string()),
            _ => (500, "boom".to_string()),
        })
        .await;
        let store = RetrievalStore::connect(config(&server.base_url), FallbackPolicy::Sticky).await;

        store
            .insert_vectors("research_papers", vec![vec![1.0, 0.0]], vec![metadata(7)])
            .await
            .expect("insert degrades instead of failing");

        assert_eq!(store.mode(), StoreMode::LocalFallback);
        let hits = store.search("research_papers", &[1.0, 0.0], 5, 0.0).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.chunk_index, 7);
        assert_eq!(
            server.routes(),
            vec!["GET /health".to_string(), "POST /vectors/insert".to_string()]
        );
    }

    #[tokio::test]
    async fn retry_remote_policy_keeps_trying_remote() {
        let server = StubServer::spawn(|route| match route {
            "GET /health" => (200, "{}".to_string()),
            "POST /vectors/search" => (200, r#"{"results":[]}"#.to_string()),
            _ => (500, "boom".to_string()),
        })
        .await;
        let store =
            RetrievalStore::connect(config(&server.base_url), FallbackPolicy::RetryRemote).await;

        store
            .insert_vectors("research_papers", vec![vec![1.0, 0.0]], vec![metadata(7)])
            .await
            .expect("insert degrades instead of failing");

        assert_eq!(store.mode(), StoreMode::Remote);
        assert_eq!(store.local_len(), 1);
        let hits = store.search("research_papers", &[1.0, 0.0], 5, 0.0).await;
        assert!(hits.is_empty());
        assert_eq!(server.routes().last().map(String::as_str), Some("POST /vectors/search"));
    }

    #[tokio::test]
    async fn rejected_collection_calls_keep_remote_mode() {
        let server = StubServer::spawn(|route| match route {
            "POST /collections" => (409, "collection already exists".to_string()),
            route if route.starts_with("DELETE /collections/") => (404, String::new()),
            _ => (200, "{}".to_string()),
        })
        .await;
        let store = RetrievalStore::connect(config(&server.base_url), FallbackPolicy::Sticky).await;

        store.create_collection("research_papers", 2).await;
        assert_eq!(store.mode(), StoreMode::Remote);

        store
            .insert_vectors("research_papers", vec![vec![1.0, 0.0]], vec![metadata(0)])
            .await
            .expect("aligned insert");
        store.delete_collection("research_papers").await;

        assert_eq!(store.mode(), StoreMode::Remote);
        assert_eq!(store.local_len(), 0);
        assert_eq!(
            server.routes(),
            vec![
                "GET /health".to_string(),
                "POST /collections".to_string(),
                "POST /vectors/insert".to_string(),
                "DELETE /collections/research_papers".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn delete_collection_clears_local_records() {
        let store = RetrievalStore::local_only();
        store
            .insert_vectors("research_papers", vec![vec![1.0]], vec![metadata(0)])
            .await
            .expect("aligned insert");

        store.delete_collection("research_papers").await;

        assert_eq!(store.local_len(), 0);
    }
}
