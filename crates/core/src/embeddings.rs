use crate::error::ProviderError;
use crate::providers::{GeminiEmbedder, OpenAiEmbedder, ProviderConfig};
use crate::traits::Embedder;
use async_trait::async_trait;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Offline embedder hashing character trigrams into a fixed number of buckets.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let mut hash = 1469598103934665603u64;
            for ch in window {
                let mut buffer = [0u8; 4];
                for byte in ch.encode_utf8(&mut buffer).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimension(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_text(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[derive(Debug, Clone)]
pub enum EmbeddingConfig {
    Ngram { dimensions: usize },
    OpenAi(ProviderConfig),
    Gemini(ProviderConfig),
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::Ngram {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

/// The embedding backend, chosen once at startup.
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    Ngram(CharacterNgramEmbedder),
    OpenAi(OpenAiEmbedder),
    Gemini(GeminiEmbedder),
}

impl EmbeddingProvider {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        Ok(match config {
            EmbeddingConfig::Ngram { dimensions } => Self::Ngram(CharacterNgramEmbedder {
                dimensions: *dimensions,
            }),
            EmbeddingConfig::OpenAi(provider) => Self::OpenAi(OpenAiEmbedder::new(provider)?),
            EmbeddingConfig::Gemini(provider) => Self::Gemini(GeminiEmbedder::new(provider)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ngram(_) => "ngram",
            Self::OpenAi(_) => "openai",
            Self::Gemini(_) => "gemini",
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    fn dimension(&self) -> usize {
        match self {
            Self::Ngram(embedder) => embedder.dimension(),
            Self::OpenAi(embedder) => embedder.dimension(),
            Self::Gemini(embedder) => embedder.dimension(),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        match self {
            Self::Ngram(embedder) => embedder.embed_one(text).await,
            Self::OpenAi(embedder) => embedder.embed_one(text).await,
            Self::Gemini(embedder) => embedder.embed_one(text).await,
        }
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        match self {
            Self::Ngram(embedder) => embedder.embed_many(texts).await,
            Self::OpenAi(embedder) => embedder.embed_many(texts).await,
            Self::Gemini(embedder) => embedder.embed_many(texts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed_text("Attention mechanisms in transformers");
        let second = embedder.embed_text("Attention mechanisms in transformers");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        assert_eq!(embedder.embed_text("abc").len(), 32);
        assert_eq!(embedder.dimension(), 32);
    }

    #[test]
    fn short_text_embeds_to_zero_vector() {
        let embedder = CharacterNgramEmbedder::default();
        assert!(embedder.embed_text("ab").iter().all(|value| *value == 0.0));
    }

    #[test]
    fn related_texts_score_higher_than_unrelated() {
        let embedder = CharacterNgramEmbedder::default();
        let query = embedder.embed_text("graph neural networks");
        let related = embedder.embed_text("we train graph neural networks on molecules");
        let unrelated = embedder.embed_text("quarterly tax filing deadlines");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn provider_dispatch_preserves_order_and_length() {
        let provider = EmbeddingProvider::from_config(&EmbeddingConfig::Ngram { dimensions: 64 })
            .expect("ngram provider needs no credentials");
        let texts = vec!["first text".to_string(), "second text".to_string()];

        let vectors = provider.embed_many(&texts).await.expect("embeddings");

        assert_eq!(provider.name(), "ngram");
        assert_eq!(provider.dimension(), 64);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], provider.embed_one("second text").await.expect("embedding"));
    }

    #[test]
    fn hosted_provider_without_key_fails_at_construction() {
        let config = EmbeddingConfig::OpenAi(ProviderConfig::openai("", "text-embedding-3-small"));
        assert!(matches!(
            EmbeddingProvider::from_config(&config),
            Err(ProviderError::MissingCredentials(_))
        ));
    }
}
