//! # Message Store
//!
//! The ordered, id-keyed message list behind a chat.
//!
//! ```text
//! MessageStore
//! ├── messages: Vec<Message>   // insertion order = display order
//! ├── character_name: String   // sender of synthesized greetings
//! └── greeting: String         // text of synthesized greetings
//! ```
//!
//! Two invariants are guarded here rather than raised:
//! the list is never empty once initialized, and greetings cannot be deleted.

use log::{debug, warn};

use crate::core::character::Character;
use crate::core::message::{Message, MessagePatch};
use crate::core::variation::{self, Navigation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The last message was removed and a fresh greeting took its place.
    Reseeded,
    /// The target is a greeting; nothing changed.
    GreetingProtected,
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    character_name: String,
    greeting: String,
}

impl MessageStore {
    /// Seed the store for `character`. An empty history yields the greeting.
    pub fn initialize(character: &Character, history: Vec<Message>) -> Self {
        let mut store = Self {
            messages: Vec::new(),
            character_name: character.name.clone(),
            greeting: character.greeting_text(),
        };
        store.replace_all(history);
        store
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn append(&mut self, message: Message) {
        debug!("Appending message {} from {}", message.id, message.sender);
        self.messages.push(message);
    }

    /// Merge `patch` into the message with `id`. Returns false for unknown ids.
    pub fn update_by_id(&mut self, id: &str, patch: MessagePatch) -> bool {
        match self.get_mut(id) {
            Some(message) => {
                patch.apply(message);
                true
            }
            None => {
                warn!("update_by_id: no message with id {id}");
                false
            }
        }
    }

    pub fn delete_by_id(&mut self, id: &str) -> DeleteOutcome {
        let Some(index) = self.position(id) else {
            warn!("delete_by_id: no message with id {id}");
            return DeleteOutcome::NotFound;
        };
        if self.messages[index].is_greeting {
            debug!("Refusing to delete greeting {id}");
            return DeleteOutcome::GreetingProtected;
        }

        self.messages.remove(index);
        if self.messages.is_empty() {
            self.messages.push(self.fresh_greeting());
            return DeleteOutcome::Reseeded;
        }
        DeleteOutcome::Deleted
    }

    /// Reset the list. Empty input reseeds the greeting.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        if self.messages.is_empty() {
            self.messages.push(self.fresh_greeting());
        }
    }

    /// Copy of the list for persistence.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    // ── Variations ──────────────────────────────────────────────────────

    /// Store a regenerated response for `id` and show it.
    pub fn push_variation(&mut self, id: &str, text: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(message) => {
                variation::push_variation(message, text);
                true
            }
            None => {
                warn!("push_variation: message {id} no longer exists");
                false
            }
        }
    }

    pub fn previous_variation(&mut self, id: &str) -> Option<Navigation> {
        self.get_mut(id).map(variation::previous)
    }

    pub fn next_variation(&mut self, id: &str) -> Option<Navigation> {
        self.get_mut(id).map(variation::next)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn fresh_greeting(&self) -> Message {
        Message::greeting(&self.character_name, &self.greeting)
    }
}
