use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::Client;
use serde::Deserialize;

use chat_llm::{CompletionProvider, OpenAIProvider, RelayProvider};
use chat_server::handlers::greeting::GREETING_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    /// Stream through the chat server's relay route
    Relay,
    /// Call the OpenAI-compatible endpoint directly
    #[value(name = "openai")]
    OpenAI,
}

/// Connection settings for building a provider.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub provider: ProviderKind,
    pub server_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub connect_timeout: Duration,
}

pub fn http_client(options: &ClientOptions) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .build()
        .context("failed to build HTTP client")
}

pub fn build_provider(options: &ClientOptions) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let client = http_client(options)?;

    match options.provider {
        ProviderKind::Relay => {
            let provider = RelayProvider::new(options.server_url.clone()).with_client(client);
            log::debug!("Using relay provider at {}", provider.endpoint());
            Ok(Arc::new(provider))
        }
        ProviderKind::OpenAI => {
            let Some(api_key) = options.openai_api_key.as_deref().filter(|k| !k.is_empty()) else {
                bail!("--openai-api-key (or OPENAI_API_KEY) is required with --provider openai");
            };
            let mut provider = OpenAIProvider::new(api_key).with_client(client);
            if let Some(base_url) = &options.openai_base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            log::debug!("Using OpenAI provider with model {}", provider.model());
            Ok(Arc::new(provider))
        }
    }
}

#[derive(Debug, Deserialize)]
struct Greeting {
    message: String,
}

/// GET the greeting endpoint and return its `message`.
pub async fn fetch_greeting(client: &Client, server_url: &str) -> anyhow::Result<String> {
    let url = format!("{}{}", server_url.trim_end_matches('/'), GREETING_PATH);
    log::debug!("GET {}", url);

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to reach {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("GET {} returned {}", url, status);
    }

    let greeting: Greeting = response
        .json()
        .await
        .context("greeting response was not the expected JSON")?;
    Ok(greeting.message)
}
