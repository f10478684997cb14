use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FILE_PLACEHOLDER: &str = "[file attachment]";
pub const OTHER_PLACEHOLDER: &str = "[content]";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One typed piece of a message. Only `Text` contributes model input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    File {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
    /// Any part type this crate does not model.
    #[serde(other)]
    Other,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Display form: text verbatim, anything else as a placeholder.
    pub fn render(&self) -> &str {
        match self {
            Part::Text { text } => text,
            Part::File { .. } => FILE_PLACEHOLDER,
            Part::Other => OTHER_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default = "generate_id")]
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role,
            parts: vec![Part::text(text)],
            created_at: Utc::now(),
        }
    }

    /// Concatenation of the text parts only.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    /// Concatenation of every part's display form.
    pub fn render(&self) -> String {
        self.parts.iter().map(Part::render).collect()
    }

    /// Extend the active (last) text part, starting one if the message has none.
    pub fn push_text(&mut self, fragment: &str) {
        if let Some(Part::Text { text }) = self.parts.last_mut() {
            text.push_str(fragment);
        } else {
            self.parts.push(Part::text(fragment));
        }
    }

    /// Wire form with the transport-local id and timestamp removed.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: self.role,
            parts: self.parts.clone(),
        }
    }
}

/// The record a completion endpoint receives: role and parts, nothing client-local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl WireMessage {
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }
}
