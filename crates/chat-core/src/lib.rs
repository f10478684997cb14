//! chat-core - Data model for streaming chat sessions
//!
//! Messages, parts, the transcript, session status and the error taxonomy
//! shared by the provider, session, server and CLI crates.

pub mod error;
pub mod message;
pub mod status;
pub mod transcript;

pub use error::{StreamError, SubmitError};
pub use message::{Message, Part, Role, WireMessage};
pub use status::{SessionStatus, TurnEvent};
pub use transcript::Transcript;
