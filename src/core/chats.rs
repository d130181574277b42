//! # Recent Chats
//!
//! Save/load conversations under `~/.hearth/chats/`.
//!
//! Each chat is a JSON file (`<uuid>.json`) holding its metadata and message
//! list, plus a lightweight index (`chats.json`) so the chat list can render
//! without opening every file.
//!
//! All writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::message::{Message, filter_history};
use crate::core::state::App;

const INDEX_FILE: &str = "chats.json";
const TITLE_MAX_CHARS: usize = 60;

/// Summary metadata for a chat (stored in the index file).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMeta {
    pub id: String,
    pub title: String,
    pub character_id: String,
    pub character_name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub message_count: usize,
}

/// Index of all chats, most recently updated first.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct ChatIndex {
    pub chats: Vec<ChatMeta>,
}

/// Everything needed to write one chat, detached from `App` so it can sit
/// in a debouncer.
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub id: String,
    pub character_id: String,
    pub character_name: String,
    pub messages: Vec<Message>,
}

#[derive(Serialize)]
struct ChatFileRef<'a> {
    meta: &'a ChatMeta,
    messages: &'a [Message],
}

/// On-disk shape when reading. Messages stay raw so malformed entries can be
/// filtered instead of failing the whole file.
#[derive(Deserialize)]
struct ChatFile {
    meta: ChatMeta,
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

#[derive(Debug)]
pub struct LoadedChat {
    pub meta: ChatMeta,
    pub messages: Vec<Message>,
}

pub fn new_chat_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Title from the first user message: its first line, at most 60 chars.
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.is_user_message && m.is_text()) else {
        return "Untitled".to_string();
    };
    let first_line = first.text().lines().next().unwrap_or("").trim();
    if first_line.chars().count() > TITLE_MAX_CHARS {
        let cut: String = first_line.chars().take(TITLE_MAX_CHARS - 3).collect();
        return format!("{cut}...");
    }
    if first_line.is_empty() {
        return "Untitled".to_string();
    }
    first_line.to_string()
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Directory-backed chat persistence.
#[derive(Debug, Clone)]
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    /// Store rooted at `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `~/.hearth/chats/`.
    pub fn open_default() -> io::Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
        Self::new(home.join(".hearth").join("chats"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chat_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write a chat and refresh the index. Chats without a user message are
    /// skipped; there is nothing to come back to.
    pub fn save(&self, snapshot: &ChatSnapshot) -> io::Result<()> {
        if !snapshot.messages.iter().any(|m| m.is_user_message) {
            debug!("Skipping save of chat {} (no user messages)", snapshot.id);
            return Ok(());
        }

        let mut index = self.load_index().unwrap_or_default();
        let existing = index.chats.iter().find(|c| c.id == snapshot.id);
        let now = Utc::now().timestamp_millis();

        let meta = ChatMeta {
            id: snapshot.id.clone(),
            title: existing
                .map(|m| m.title.clone())
                .unwrap_or_else(|| derive_title(&snapshot.messages)),
            character_id: snapshot.character_id.clone(),
            character_name: snapshot.character_name.clone(),
            created_at: existing.map(|m| m.created_at).unwrap_or(now),
            updated_at: now,
            message_count: snapshot.messages.len(),
        };

        atomic_write_json(
            &self.chat_path(&snapshot.id),
            &ChatFileRef {
                meta: &meta,
                messages: &snapshot.messages,
            },
        )?;

        index.chats.retain(|c| c.id != snapshot.id);
        index.chats.push(meta);
        index
            .chats
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        atomic_write_json(&self.dir.join(INDEX_FILE), &index)?;

        debug!("Chat saved: {}", snapshot.id);
        Ok(())
    }

    /// Load a chat by id. Malformed message entries are dropped; legacy
    /// entries without a user flag are matched against `persona_name`.
    pub fn load(&self, id: &str, persona_name: &str) -> io::Result<LoadedChat> {
        let json = fs::read_to_string(self.chat_path(id))?;
        let file: ChatFile =
            serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let messages = filter_history(file.messages, persona_name);
        info!("Loaded chat {} ({} messages)", id, messages.len());
        Ok(LoadedChat {
            meta: file.meta,
            messages,
        })
    }

    pub fn delete(&self, id: &str) -> io::Result<()> {
        let path = self.chat_path(id);
        if path.exists() {
            fs::remove_file(path)?;
        }

        let mut index = self.load_index().unwrap_or_default();
        index.chats.retain(|c| c.id != id);
        atomic_write_json(&self.dir.join(INDEX_FILE), &index)?;
        Ok(())
    }

    pub fn load_index(&self) -> io::Result<ChatIndex> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(ChatIndex::default());
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Snapshot the active chat for saving, assigning it an id on first save.
/// Returns None while the chat holds no user message.
pub fn snapshot_chat(app: &mut App) -> Option<ChatSnapshot> {
    if !app.store.messages().iter().any(|m| m.is_user_message) {
        return None;
    }
    let id = app.current_chat_id.get_or_insert_with(new_chat_id).clone();
    Some(ChatSnapshot {
        id,
        character_id: app.character.id.clone(),
        character_name: app.character.name.clone(),
        messages: app.store.snapshot(),
    })
}

/// Save a snapshot, logging instead of failing. Used from the event loop.
pub fn save_logged(chats: &ChatStore, snapshot: &ChatSnapshot) {
    if let Err(e) = chats.save(snapshot) {
        warn!("Failed to save chat {}: {}", snapshot.id, e);
    }
}
