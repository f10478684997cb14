//! UI message stream events, as emitted by the `/api/chat` relay.
//!
//! Each event travels as one SSE `data:` line holding a JSON object tagged by
//! `type`; the stream closes with a literal `[DONE]` data line.

use serde::{Deserialize, Serialize};

use super::errors::{ProtocolError, ProtocolResult};
use crate::types::Frame;

/// Response header announcing the UI message stream protocol.
pub const UI_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
pub const UI_STREAM_VERSION: &str = "v1";
pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UIStreamEvent {
    /// Beginning of the assistant message.
    #[serde(rename = "start")]
    MessageStart {
        #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    TextStart {
        id: String,
    },

    TextDelta {
        #[serde(default)]
        id: String,
        delta: String,
    },

    TextEnd {
        id: String,
    },

    StartStep,

    FinishStep,

    Finish {
        #[serde(rename = "finishReason", default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },

    Abort {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },

    /// Event types the chat client has no use for (tool, reasoning, source...).
    #[serde(other)]
    Unknown,
}

impl UIStreamEvent {
    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn error(error_text: impl Into<String>) -> Self {
        Self::Error {
            error_text: error_text.into(),
        }
    }

    /// Encode as one SSE event.
    pub fn to_sse(&self) -> ProtocolResult<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }

    /// The SSE event closing a UI message stream.
    pub fn done_sse() -> String {
        format!("data: {DONE_MARKER}\n\n")
    }

    /// The chat frame this event carries, if any.
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::TextDelta { delta, .. } if delta.is_empty() => None,
            Self::TextDelta { delta, .. } => Some(Frame::Delta(delta)),
            Self::Finish { .. } => Some(Frame::Finish),
            Self::Error { error_text } => Some(Frame::Error(error_text)),
            Self::Abort { reason } => Some(Frame::Error(format!(
                "aborted: {}",
                reason.as_deref().unwrap_or("no reason given")
            ))),
            _ => None,
        }
    }
}

/// Decode one SSE `data:` payload of a UI message stream.
///
/// - `"[DONE]"` and blank payloads -> `None`
/// - Known events -> their frame, if they carry one
/// - Invalid JSON -> error
pub fn parse_ui_stream_data(data: &str) -> ProtocolResult<Option<Frame>> {
    let data = data.trim();
    if data.is_empty() || data == DONE_MARKER {
        return Ok(None);
    }

    let event: UIStreamEvent = serde_json::from_str(data)
        .map_err(|e| ProtocolError::InvalidStreamChunk(format!("{e}: {data}")))?;
    Ok(event.into_frame())
}
