use crate::error::ProviderError;
use crate::providers::{GeminiChat, OpenAiChat, ProviderConfig};
use crate::traits::Generator;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub enum GenerationConfig {
    OpenAi(ProviderConfig),
    Gemini(ProviderConfig),
}

/// The answer-synthesis backend, chosen once at startup.
#[derive(Debug, Clone)]
pub enum GenerationProvider {
    OpenAi(OpenAiChat),
    Gemini(GeminiChat),
}

impl GenerationProvider {
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ProviderError> {
        Ok(match config {
            GenerationConfig::OpenAi(provider) => Self::OpenAi(OpenAiChat::new(provider)?),
            GenerationConfig::Gemini(provider) => Self::Gemini(GeminiChat::new(provider)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Gemini(_) => "gemini",
        }
    }
}

#[async_trait]
impl Generator for GenerationProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        match self {
            Self::OpenAi(chat) => chat.generate(system, user).await,
            Self::Gemini(chat) => chat.generate(system, user).await,
        }
    }
}
