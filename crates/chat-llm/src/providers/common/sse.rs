//! Shared SSE -> [`FrameStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{FrameStream, LLMError, Result};
use crate::types::{Frame, UNTERMINATED_STREAM};

/// Decode an SSE response body into frames, one handler call per event.
///
/// The handler maps an event's name and data to a frame, or `None` to skip the
/// event. The returned stream always ends in exactly one of:
/// - a terminal frame (`Finish` or `Error`), after which the body is not read further
/// - a single `LLMError::Stream`, for a decode failure, a handler error, or a body
///   that closed before any terminal frame
pub fn frame_stream_from_sse<H>(response: Response, mut handler: H) -> FrameStream
where
    H: FnMut(&str, &str) -> Result<Option<Frame>> + Send + 'static,
{
    let mut events = Box::pin(response.bytes_stream().eventsource());

    Box::pin(async_stream::stream! {
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(LLMError::Stream(e.to_string()));
                    return;
                }
            };

            match handler(&event.event, &event.data) {
                Ok(Some(frame)) => {
                    let terminal = frame.is_terminal();
                    yield Ok(frame);
                    if terminal {
                        return;
                    }
                }
                Ok(None) => {}
                Err(LLMError::Stream(message)) => {
                    yield Err(LLMError::Stream(message));
                    return;
                }
                Err(other) => {
                    yield Err(LLMError::Stream(other.to_string()));
                    return;
                }
            }
        }

        log::debug!("SSE body closed without a terminal frame");
        yield Err(LLMError::Stream(UNTERMINATED_STREAM.to_string()));
    })
}

/// Reject non-2xx responses before any streaming starts.
pub async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await?;
    Err(LLMError::Api(format!("HTTP {}: {}", status, text)))
}
