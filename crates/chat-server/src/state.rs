use std::sync::Arc;

use chat_llm::{CompletionProvider, OpenAIProvider};

/// Upstream settings for the chat relay.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

pub struct AppState {
    pub provider: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn from_upstream(config: &UpstreamConfig) -> Self {
        log::info!(
            "Creating OpenAI provider with base URL: {} and model: {}",
            config.base_url,
            config.model
        );
        if config.api_key.is_empty() {
            log::warn!("No OpenAI API key configured, /api/chat requests will be rejected upstream");
        }

        let provider = OpenAIProvider::new(config.api_key.clone())
            .with_base_url(config.base_url.clone())
            .with_model(config.model.clone());

        Self::new(Arc::new(provider))
    }
}
