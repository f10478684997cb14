use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::protocol::parse_ui_stream_data;
use crate::provider::{CompletionProvider, FrameStream, Result};
use chat_core::WireMessage;

use super::common::sse::{ensure_success, frame_stream_from_sse};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const CHAT_PATH: &str = "/api/chat";

#[derive(Serialize)]
struct RelayRequest<'a> {
    messages: &'a [WireMessage],
}

/// Streams completions through the chat server's `/api/chat` relay.
///
/// The relay owns model selection and credentials; `model` overrides are ignored.
pub struct RelayProvider {
    client: Client,
    server_url: String,
}

impl RelayProvider {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server_url, CHAT_PATH)
    }
}

impl Default for RelayProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

#[async_trait]
impl CompletionProvider for RelayProvider {
    async fn stream(&self, messages: &[WireMessage], model: Option<&str>) -> Result<FrameStream> {
        if let Some(model) = model {
            log::debug!("Relay provider ignores model override '{}'", model);
        }

        let response = self
            .client
            .post(self.endpoint())
            .json(&RelayRequest { messages })
            .send()
            .await?;

        let response = ensure_success(response).await?;

        Ok(frame_stream_from_sse(response, |_event, data| {
            Ok(parse_ui_stream_data(data)?)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_server_url_and_chat_path() {
        let provider = RelayProvider::new("http://localhost:3000/");
        assert_eq!(provider.endpoint(), "http://localhost:3000/api/chat");
    }

    #[test]
    fn default_points_at_local_server() {
        assert_eq!(
            RelayProvider::default().endpoint(),
            "http://localhost:3000/api/chat"
        );
    }
}
