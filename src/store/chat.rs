//! Chat board
//!
//! In-memory message list shared by every connection worker.

use parking_lot::Mutex;

/// One posted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Append-only message list
///
/// All access goes through one mutex; posting order is preserved.
#[derive(Debug, Default)]
pub struct ChatBoard {
    messages: Mutex<Vec<ChatMessage>>,
}

impl ChatBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn post(&self, from: &str, to: &str, body: &str) {
        self.messages.lock().push(ChatMessage {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
    }

    /// Messages exchanged between two users, in either direction, oldest first
    pub fn conversation(&self, user_a: &str, user_b: &str) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| {
                (m.from == user_a && m.to == user_b) || (m.from == user_b && m.to == user_a)
            })
            .cloned()
            .collect()
    }

    /// Total number of stored messages
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
