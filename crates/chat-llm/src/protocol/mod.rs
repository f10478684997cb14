//! Wire protocols spoken between the chat client and the relay server.

pub mod errors;
pub mod ui_stream;

pub use errors::{ProtocolError, ProtocolResult};
pub use ui_stream::{
    parse_ui_stream_data, UIStreamEvent, DONE_MARKER, UI_STREAM_HEADER, UI_STREAM_VERSION,
};
