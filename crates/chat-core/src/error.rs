use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Synchronous rejection of a `submit` call. Never alters transcript or status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Message text is empty")]
    InvalidInput,

    #[error("A submission is already in flight")]
    Busy,
}

/// Failure observed while a turn is streaming. Recorded as session state.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

impl StreamError {
    pub fn detail(&self) -> &str {
        match self {
            Self::Transport(detail) | Self::Remote(detail) => detail,
        }
    }
}
