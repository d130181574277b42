//! # Messages
//!
//! The canonical chat record. Everything the UI shows is derived from a
//! `Message`: segments are recomputed from `text` on render, heights are
//! measured from it, and the variation navigator rewrites it.
//!
//! ```text
//! Message
//! ├── id: String                     // "<unix millis>-<sequence>", sorts by creation
//! ├── sender: String                 // display label only
//! ├── is_user_message: bool          // fixed at creation
//! ├── text: String                   // active content (private)
//! ├── timestamp: i64                 // unix millis, immutable
//! ├── kind: MessageKind              // text | image | voice
//! ├── variations: Option<Vec<String>>       (private)
//! └── current_variation_index: Option<usize> (private, 1-based)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

/// Monotonic per-process sequence appended to message ids.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a unique id that sorts by creation time.
///
/// The millisecond prefix orders ids across runs; the sequence suffix keeps
/// ids created within the same millisecond distinct and ordered.
pub fn new_message_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0);
    let seq = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!("{millis:013}-{seq:06}")
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Voice,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: String,
    text: String,
    pub timestamp: i64,
    #[serde(default, rename = "isUser")]
    pub is_user_message: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_pinned: bool,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_greeting: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_variation_index: Option<usize>,
}

impl Message {
    fn new(sender: impl Into<String>, text: impl Into<String>, is_user_message: bool) -> Self {
        Self {
            id: new_message_id(),
            sender: sender.into(),
            text: text.into(),
            timestamp: now_millis(),
            is_user_message,
            is_pinned: false,
            kind: MessageKind::Text,
            media_url: None,
            is_greeting: false,
            is_system: false,
            variations: None,
            current_variation_index: None,
        }
    }

    /// A message typed by the user under their persona name.
    pub fn user(persona_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(persona_name, text, true)
    }

    /// A reply from the character.
    pub fn character(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, text, false)
    }

    /// The character's protected opening message.
    pub fn greeting(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            is_greeting: true,
            ..Self::new(name, text, false)
        }
    }

    /// A notice from the app itself (generation failure, safety block).
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            is_system: true,
            ..Self::new("System", text, false)
        }
    }

    /// A non-text attachment. `caption` becomes the text.
    pub fn media(
        sender: impl Into<String>,
        kind: MessageKind,
        url: impl Into<String>,
        caption: impl Into<String>,
        is_user_message: bool,
    ) -> Self {
        Self {
            kind,
            media_url: Some(url.into()),
            ..Self::new(sender, caption, is_user_message)
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the active text. When alternatives exist the active
    /// alternative is rewritten too, so `text` keeps matching it.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let (Some(variations), Some(index)) =
            (self.variations.as_mut(), self.current_variation_index)
            && let Some(slot) = variations.get_mut(index.wrapping_sub(1))
        {
            slot.clone_from(&text);
        }
        self.text = text;
    }

    pub fn variations(&self) -> Option<&[String]> {
        self.variations.as_deref()
    }

    /// 1-based index of the shown alternative, if any exist.
    pub fn current_variation_index(&self) -> Option<usize> {
        self.current_variation_index
    }

    /// `(current, total)` for display, e.g. `2/3`. None for single responses.
    pub fn variation_position(&self) -> Option<(usize, usize)> {
        let total = self.variations.as_ref()?.len();
        self.current_variation_index.map(|i| (i, total))
    }

    pub(crate) fn variations_mut(&mut self) -> (&mut Option<Vec<String>>, &mut Option<usize>, &mut String) {
        (
            &mut self.variations,
            &mut self.current_variation_index,
            &mut self.text,
        )
    }

    /// Repair variation fields that came from disk in an inconsistent state.
    pub fn normalize(&mut self) {
        match self.variations.as_mut() {
            Some(variations) if variations.is_empty() => {
                self.variations = None;
                self.current_variation_index = None;
            }
            Some(variations) => {
                let len = variations.len();
                let index = self.current_variation_index.unwrap_or(len).clamp(1, len);
                self.current_variation_index = Some(index);
                self.text.clone_from(&variations[index - 1]);
            }
            None => self.current_variation_index = None,
        }
    }

    /// Whether this message takes part in segmentation.
    pub fn is_text(&self) -> bool {
        self.kind == MessageKind::Text
    }
}

/// Partial update merged into a message by id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub is_pinned: Option<bool>,
    pub sender: Option<String>,
}

impl MessagePatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn pinned(is_pinned: bool) -> Self {
        Self {
            is_pinned: Some(is_pinned),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, message: &mut Message) {
        if let Some(text) = self.text {
            message.set_text(text);
        }
        if let Some(is_pinned) = self.is_pinned {
            message.is_pinned = is_pinned;
        }
        if let Some(sender) = self.sender {
            message.sender = sender;
        }
    }
}

/// Older histories used the creation time as a numeric id.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum HistoryId {
    Text(String),
    Number(serde_json::Number),
}

impl HistoryId {
    fn into_string(self) -> String {
        match self {
            HistoryId::Text(id) => id,
            HistoryId::Number(n) => n.to_string(),
        }
    }
}

/// Unix millis, or an RFC 3339 string as written by some exporters.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum HistoryTimestamp {
    Millis(i64),
    Rfc3339(String),
}

impl HistoryTimestamp {
    fn into_millis(self) -> Option<i64> {
        match self {
            HistoryTimestamp::Millis(millis) => Some(millis),
            HistoryTimestamp::Rfc3339(text) => chrono::DateTime::parse_from_rfc3339(&text)
                .ok()
                .map(|t| t.timestamp_millis()),
        }
    }
}

/// Persisted history entry as it may appear on disk. Required fields are
/// optional here so malformed entries can be recognized and dropped.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    id: Option<HistoryId>,
    sender: Option<String>,
    text: Option<String>,
    timestamp: Option<HistoryTimestamp>,
    #[serde(rename = "isUser")]
    is_user: Option<bool>,
    #[serde(default)]
    is_pinned: bool,
    #[serde(default, rename = "type")]
    kind: MessageKind,
    image_url: Option<String>,
    #[serde(default)]
    is_greeting: bool,
    #[serde(default)]
    is_system: bool,
    variations: Option<Vec<String>>,
    current_variation_index: Option<usize>,
}

impl HistoryEntry {
    fn into_message(self, persona_name: &str) -> Option<Message> {
        let (Some(id), Some(sender), Some(text), Some(timestamp)) = (
            self.id.map(HistoryId::into_string),
            self.sender,
            self.text,
            self.timestamp.and_then(HistoryTimestamp::into_millis),
        ) else {
            return None;
        };
        if id.is_empty() {
            return None;
        }
        // Older chats never stored the flag; derive it once here.
        let is_user_message = self.is_user.unwrap_or(sender == persona_name);
        let mut message = Message {
            id,
            sender,
            text,
            timestamp,
            is_user_message,
            is_pinned: self.is_pinned,
            kind: self.kind,
            media_url: self.image_url,
            is_greeting: self.is_greeting,
            is_system: self.is_system,
            variations: self.variations,
            current_variation_index: self.current_variation_index,
        };
        message.normalize();
        Some(message)
    }
}

/// Turn raw persisted history into messages, silently dropping entries that
/// are missing an id, sender, text or timestamp (or carry the wrong types).
pub fn filter_history(entries: Vec<serde_json::Value>, persona_name: &str) -> Vec<Message> {
    let total = entries.len();
    let messages: Vec<Message> = entries
        .into_iter()
        .filter_map(|value| serde_json::from_value::<HistoryEntry>(value).ok())
        .filter_map(|entry| entry.into_message(persona_name))
        .collect();
    if messages.len() < total {
        debug!(
            "Dropped {} malformed history entries",
            total - messages.len()
        );
    }
    messages
}
