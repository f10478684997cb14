use serde::{Deserialize, Serialize};

use crate::message::{Message, WireMessage};

/// Conversation history in insertion order. Append-only, except that a
/// message already in the transcript may have text appended to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        debug_assert!(
            self.get(&message.id).is_none(),
            "duplicate message id {}",
            message.id
        );
        self.messages.push(message);
    }

    /// Append `fragment` to the message with `id`. Returns false if no such message.
    pub fn append_text(&mut self, id: &str, fragment: &str) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.id == id) {
            Some(message) => {
                message.push_text(fragment);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Request payload for a completion endpoint, ids stripped.
    pub fn to_wire(&self) -> Vec<WireMessage> {
        self.messages.iter().map(Message::to_wire).collect()
    }
}
