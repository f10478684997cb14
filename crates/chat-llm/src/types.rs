/// One unit of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text to append verbatim to the assistant message.
    Delta(String),
    /// The completion ended normally.
    Finish,
    /// The endpoint reported an error and ended the stream.
    Error(String),
}

impl Frame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Finish | Frame::Error(_))
    }
}

/// Reported when a completion body closes before `Finish` or `Error`.
pub const UNTERMINATED_STREAM: &str = "stream ended before a terminal frame";
