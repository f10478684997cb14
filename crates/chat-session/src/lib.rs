pub mod config;
pub mod events;
pub mod session;
pub mod stream;

pub use config::SessionConfig;
pub use events::SessionEvent;
pub use session::ChatSession;

pub use chat_core::{Message, Part, Role, SessionStatus, StreamError, SubmitError, Transcript};
