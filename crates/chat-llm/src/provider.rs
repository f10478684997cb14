use crate::types::Frame;
use async_trait::async_trait;
use chat_core::{StreamError, WireMessage};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// `Err` items are transport failures; `Frame::Error` is a remote terminal.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

impl From<LLMError> for StreamError {
    fn from(error: LLMError) -> Self {
        match error {
            LLMError::Api(message) => StreamError::Remote(message),
            other => StreamError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streamed completion for `messages`.
    ///
    /// # Arguments
    /// * `messages` - Conversation so far, ids already stripped
    /// * `model` - Optional model override. If None, uses the provider's default model
    async fn stream(&self, messages: &[WireMessage], model: Option<&str>) -> Result<FrameStream>;
}
