use chat_core::{Message, SessionStatus, StreamError};
use serde::Serialize;

/// Change notifications delivered to session observers, in mutation order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user message on submit, or the assistant message on the first fragment.
    MessageAppended { message: Message },

    /// Text appended to an assistant message already in the transcript.
    FragmentAppended { message_id: String, fragment: String },

    StatusChanged { status: SessionStatus },

    /// The turn failed; followed by `StatusChanged { status: Error }`.
    Failed { error: StreamError },
}
