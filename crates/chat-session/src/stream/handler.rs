use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use chat_core::StreamError;
use chat_llm::{Frame, FrameStream};

pub use chat_llm::UNTERMINATED_STREAM;

/// How a turn's frame stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Finished,
    Failed(StreamError),
    Cancelled,
}

/// Drive `stream` to its terminal frame, handing each fragment to `on_fragment`
/// in arrival order.
///
/// `on_fragment` returns false when the turn is no longer current; consumption
/// then stops with `Cancelled`, as it does when `cancel_token` fires while
/// waiting for the next frame.
pub async fn consume_frames<F>(
    mut stream: FrameStream,
    cancel_token: &CancellationToken,
    session_id: &str,
    mut on_fragment: F,
) -> TurnOutcome
where
    F: FnMut(&str) -> bool,
{
    let mut fragment_count = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log::debug!("[{}] Stream cancelled after {} fragments", session_id, fragment_count);
                return TurnOutcome::Cancelled;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Frame::Delta(fragment))) => {
                fragment_count += 1;
                if !on_fragment(&fragment) {
                    log::debug!("[{}] Turn superseded, dropping fragment", session_id);
                    return TurnOutcome::Cancelled;
                }
            }
            Some(Ok(Frame::Finish)) => {
                log::debug!(
                    "[{}] Stream completed with {} fragments",
                    session_id,
                    fragment_count
                );
                return TurnOutcome::Finished;
            }
            Some(Ok(Frame::Error(message))) => {
                return TurnOutcome::Failed(StreamError::Remote(message));
            }
            Some(Err(error)) => {
                return TurnOutcome::Failed(StreamError::from(error));
            }
            None => {
                return TurnOutcome::Failed(StreamError::Transport(UNTERMINATED_STREAM.to_string()));
            }
        }
    }
}
