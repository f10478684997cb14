/// Configuration for a chat session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model override passed to the provider on every turn.
    pub model: Option<String>,
    /// Capacity of the observer event channel. Slow observers past this lag.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: None,
            event_buffer: 256,
        }
    }
}
