pub mod protocol;
pub mod provider;
pub mod providers;
pub mod types;

pub use protocol::{ProtocolError, UIStreamEvent};
pub use provider::{CompletionProvider, FrameStream, LLMError, Result};
pub use providers::{OpenAIProvider, RelayProvider};
pub use types::{Frame, UNTERMINATED_STREAM};
