//! Ordered log of chat messages for the current session.

use chrono::{DateTime, Local};

/// Stable identity of a transcript entry. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn label(&self) -> &'static str {
        match self {
            Author::User => "You",
            Author::Assistant => "Lantern",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Author::User => "🧑",
            Author::Assistant => "🏮",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub body: String,
    pub timestamp: DateTime<Local>,
    /// Placeholder shown while a reply is outstanding.
    pub pending: bool,
}

impl Message {
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    scroll_requested: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, body: impl Into<String>, author: Author) -> MessageId {
        self.push(body.into(), author, false)
    }

    pub fn append_placeholder(&mut self) -> MessageId {
        self.push(String::new(), Author::Assistant, true)
    }

    /// Removes the entry with `id`. Returns `false` if it was already gone.
    pub fn remove(&mut self, id: MessageId) -> bool {
        match self.messages.iter().position(|m| m.id == id) {
            Some(index) => {
                self.messages.remove(index);
                self.scroll_requested = true;
                true
            }
            None => false,
        }
    }

    fn push(&mut self, body: String, author: Author, pending: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            author,
            body,
            timestamp: Local::now(),
            pending,
        });
        self.scroll_requested = true;
        id
    }

    /// Returns whether a mutation happened since the last call, and resets it.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
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

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }
}
