use chat_core::{Message, Role, StreamError, Transcript};

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "AI",
    }
}

pub fn format_message(message: &Message) -> String {
    format!("{}: {}", role_label(message.role), message.render())
}

pub fn format_transcript(transcript: &Transcript) -> Vec<String> {
    transcript.iter().map(format_message).collect()
}

pub fn format_error(error: &StreamError) -> String {
    match error {
        StreamError::Transport(detail) => format!("Connection problem: {}", detail),
        StreamError::Remote(detail) => format!("Error: {}", detail),
    }
}
