//! OpenAI-compatible request serialization helpers.
//!
//! Builds a chat completions body from [`WireMessage`] values and decodes the
//! streamed `chat.completion.chunk` payloads into [`Frame`]s.

use chat_core::WireMessage;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::Result;
use crate::types::Frame;

/// Convert wire messages to an OpenAI-compatible JSON array.
///
/// `content` is the concatenation of text parts; messages without any text are dropped.
pub fn messages_to_openai_compat_json(messages: &[WireMessage]) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|m| {
            let content = m.text();
            if content.is_empty() {
                return None;
            }

            Some(json!({
                "role": m.role.as_str(),
                "content": content,
            }))
        })
        .collect()
}

/// Build a standard OpenAI-compatible streaming chat request body.
pub fn build_openai_compat_body(
    model: &str,
    messages: &[WireMessage],
    max_output_tokens: Option<u32>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_openai_compat_json(messages),
        "stream": true,
    });

    if let Some(max_tokens) = max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

// --- OpenAI-compatible streaming chunk parsing ---

#[derive(Debug, Deserialize)]
struct OpenAICompatStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAICompatChoice>,
    error: Option<OpenAICompatError>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatChoice {
    #[serde(default)]
    delta: OpenAICompatDelta,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAICompatDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatError {
    #[serde(default)]
    message: String,
}

/// Parse an SSE `data:` payload of a chat completions stream.
///
/// - `"[DONE]"` -> `Frame::Finish`
/// - `{"error":{...}}` -> `Frame::Error`
/// - Non-empty content delta of the first choice -> `Frame::Delta`
/// - Anything else (role-only deltas, finish reasons, blank data) -> `None`
/// - Invalid JSON -> error
pub fn parse_openai_compat_sse_data(data: &str) -> Result<Option<Frame>> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    if data == "[DONE]" {
        return Ok(Some(Frame::Finish));
    }

    let chunk: OpenAICompatStreamChunk = serde_json::from_str(data)?;

    if let Some(error) = chunk.error {
        let message = if error.message.is_empty() {
            "completion endpoint reported an error".to_string()
        } else {
            error.message
        };
        return Ok(Some(Frame::Error(message)));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(Frame::Delta))
}
