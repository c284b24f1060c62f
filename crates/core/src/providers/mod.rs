pub mod gemini;
pub mod openai;

use std::time::Duration;

pub use gemini::{GeminiChat, GeminiEmbedder};
pub use openai::{OpenAiChat, OpenAiEmbedder};

pub const GENERATION_TEMPERATURE: f32 = 0.3;
pub const GENERATION_MAX_TOKENS: usize = 500;

/// Connection settings shared by every hosted provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
