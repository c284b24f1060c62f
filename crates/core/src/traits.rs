use crate::ProviderError;
use async_trait::async_trait;

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Constant for the lifetime of the embedder.
    fn dimension(&self) -> usize;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Order-preserving; returns one vector per input.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}
