use actix_web::http::header;
use actix_web::{web, HttpResponse};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use chat_core::WireMessage;
use chat_llm::protocol::{UI_STREAM_HEADER, UI_STREAM_VERSION};
use chat_llm::{Frame, FrameStream, UIStreamEvent};

use crate::error::AppError;
use crate::state::AppState;

pub use chat_llm::providers::relay::CHAT_PATH;

/// Request body of `POST /api/chat`.
///
/// Incoming messages may carry a client-side `id`; it is dropped during
/// deserialization so nothing transport-local is forwarded upstream.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
}

pub async fn handler(
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, AppError> {
    let ChatRequest { messages } = body.into_inner();
    if messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }

    let message_id = Uuid::new_v4().to_string();
    log::info!("[{}] Relaying {} messages upstream", message_id, messages.len());

    let frames = state.provider.stream(&messages, None).await.map_err(|e| {
        log::error!("[{}] Failed to open upstream stream: {}", message_id, e);
        AppError::Upstream(e.to_string())
    })?;

    Ok(HttpResponse::Ok()
        .append_header((header::CONTENT_TYPE, "text/event-stream"))
        .append_header((header::CACHE_CONTROL, "no-cache"))
        .append_header((UI_STREAM_HEADER, UI_STREAM_VERSION))
        .streaming(ui_message_stream(message_id, frames)))
}

fn encode(message_id: &str, event: &UIStreamEvent) -> Option<Bytes> {
    match event.to_sse() {
        Ok(sse) => Some(Bytes::from(sse)),
        Err(e) => {
            log::error!("[{}] Failed to encode event: {}", message_id, e);
            None
        }
    }
}

/// Re-encode upstream frames as a UI message stream.
///
/// The stream always ends with `[DONE]`, preceded by either `text-end` and
/// `finish`, or a single `error` event.
pub fn ui_message_stream(
    message_id: String,
    mut frames: FrameStream,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    async_stream::stream! {
        let text_id = format!("text-{}", message_id);

        let opening = [
            UIStreamEvent::MessageStart { message_id: Some(message_id.clone()) },
            UIStreamEvent::TextStart { id: text_id.clone() },
        ];
        for event in &opening {
            if let Some(bytes) = encode(&message_id, event) {
                yield Ok::<_, actix_web::Error>(bytes);
            }
        }

        let mut delta_count = 0usize;
        let closing = loop {
            match frames.next().await {
                Some(Ok(Frame::Delta(delta))) => {
                    delta_count += 1;
                    if let Some(bytes) = encode(&message_id, &UIStreamEvent::text_delta(&text_id, delta)) {
                        yield Ok(bytes);
                    }
                }
                Some(Ok(Frame::Finish)) => {
                    log::info!("[{}] Relay completed with {} deltas", message_id, delta_count);
                    break vec![
                        UIStreamEvent::TextEnd { id: text_id.clone() },
                        UIStreamEvent::Finish { finish_reason: None },
                    ];
                }
                Some(Ok(Frame::Error(message))) => {
                    log::warn!("[{}] Upstream reported error: {}", message_id, message);
                    break vec![UIStreamEvent::error(message)];
                }
                Some(Err(e)) => {
                    log::error!("[{}] Upstream stream failed: {}", message_id, e);
                    break vec![UIStreamEvent::error(e.to_string())];
                }
                None => {
                    log::warn!("[{}] Upstream closed without a terminal frame", message_id);
                    break vec![UIStreamEvent::error("upstream stream ended unexpectedly")];
                }
            }
        };

        for event in &closing {
            if let Some(bytes) = encode(&message_id, event) {
                yield Ok(bytes);
            }
        }
        yield Ok(Bytes::from(UIStreamEvent::done_sse()));
    }
}
