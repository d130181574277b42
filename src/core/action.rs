//! # Actions
//!
//! Everything that can happen in a chat becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! A reply arrives? That's `Action::GenerationFinished { .. }`.
//!
//! `update()` applies an action to the state and returns an `Effect`
//! describing the I/O the caller should perform. No I/O happens here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! Generation is asynchronous: the reducer records a `PendingGeneration`
//! and hands back a `GenerationJob`. When the result comes back it is applied
//! only if its request id is still the pending one and, for variations, the
//! target message still exists.

use log::{debug, info, warn};

use crate::core::chats::LoadedChat;
use crate::core::message::{Message, MessagePatch};
use crate::core::state::{App, GenerationTarget, PendingGeneration};
use crate::core::store::DeleteOutcome;
use crate::core::variation::Navigation;
use crate::inference::{Context, ReplyMode, build_context};

pub const GENERATION_FAILED_TEXT: &str =
    "I'm having trouble responding right now. Please try again in a moment.";
pub const SAFETY_BLOCKED_TEXT: &str = "Your message was blocked for safety reasons.";

#[derive(Debug)]
pub enum Action {
    /// Send a message as the persona.
    Submit(String),
    EditMessage { id: String, text: String },
    DeleteMessage(String),
    TogglePin(String),
    /// Generate a new alternative for a character message.
    Regenerate(String),
    PreviousVariation(String),
    NextVariation(String),
    /// A background generation ended. `Err` carries a log-friendly reason.
    GenerationFinished {
        request_id: u64,
        result: Result<String, String>,
    },
    CancelGeneration,
    NewChat,
    LoadChat(LoadedChat),
    CycleMode,
    Quit,
}

/// A generation for the caller to run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub request_id: u64,
    pub context: Context,
    pub model: String,
    pub mode: ReplyMode,
    pub max_output_tokens: u32,
}

#[derive(Debug, PartialEq)]
pub enum Effect {
    None,
    SpawnGeneration(GenerationJob),
    /// The conversation changed and should be persisted.
    SaveChat,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit(text) => submit(app, text),
        Action::EditMessage { id, text } => {
            let text = text.trim();
            if text.is_empty() {
                app.status_message = "Edit ignored: message can't be empty".to_string();
                return Effect::None;
            }
            if app.store.update_by_id(&id, MessagePatch::text(text)) {
                app.status_message = "Message edited".to_string();
                Effect::SaveChat
            } else {
                Effect::None
            }
        }
        Action::DeleteMessage(id) => delete(app, &id),
        Action::TogglePin(id) => {
            let Some(pinned) = app.store.get(&id).map(|m| m.is_pinned) else {
                warn!("TogglePin: no message with id {id}");
                return Effect::None;
            };
            app.store.update_by_id(&id, MessagePatch::pinned(!pinned));
            app.status_message = if pinned { "Unpinned" } else { "Pinned" }.to_string();
            Effect::SaveChat
        }
        Action::Regenerate(id) => regenerate(app, id),
        Action::PreviousVariation(id) => match app.store.previous_variation(&id) {
            Some(Navigation::Moved(index)) => {
                debug!("Message {id} now shows variation {index}");
                Effect::SaveChat
            }
            Some(_) => Effect::None,
            None => {
                warn!("PreviousVariation: no message with id {id}");
                Effect::None
            }
        },
        Action::NextVariation(id) => match app.store.next_variation(&id) {
            Some(Navigation::Moved(index)) => {
                debug!("Message {id} now shows variation {index}");
                Effect::SaveChat
            }
            Some(Navigation::NeedsGeneration) => regenerate(app, id),
            Some(Navigation::AtStart) => Effect::None,
            None => {
                warn!("NextVariation: no message with id {id}");
                Effect::None
            }
        },
        Action::GenerationFinished { request_id, result } => finish(app, request_id, result),
        Action::CancelGeneration => {
            if app.pending.take().is_some() {
                info!("Generation cancelled");
                app.status_message = "Cancelled".to_string();
            }
            app.is_loading = false;
            Effect::None
        }
        Action::NewChat => {
            drop_pending(app);
            app.store.replace_all(Vec::new());
            app.current_chat_id = None;
            app.status_message = format!("New chat with {}", app.character.name);
            Effect::None
        }
        Action::LoadChat(chat) => {
            drop_pending(app);
            info!("Loading chat {} ({})", chat.meta.id, chat.meta.title);
            app.store.replace_all(chat.messages);
            app.status_message = format!("Opened \"{}\"", chat.meta.title);
            app.current_chat_id = Some(chat.meta.id);
            Effect::None
        }
        Action::CycleMode => {
            app.mode = app.mode.next();
            app.status_message = format!("Reply mode: {}", app.mode.label());
            Effect::None
        }
        Action::Quit => Effect::Quit,
    }
}

fn submit(app: &mut App, text: String) -> Effect {
    let text = text.trim();
    if text.is_empty() {
        return Effect::None;
    }
    if app.is_loading {
        app.status_message = format!("Wait for {} to finish replying", app.character.name);
        return Effect::None;
    }
    if !app.safety.check(text, app.character.rating) {
        app.store.append(Message::system(SAFETY_BLOCKED_TEXT));
        return Effect::SaveChat;
    }

    let message = Message::user(&app.persona.name, text);
    let prompt_id = message.id.clone();
    app.store.append(message);
    start_generation(app, GenerationTarget::Reply(prompt_id))
}

fn delete(app: &mut App, id: &str) -> Effect {
    let outcome = app.store.delete_by_id(id);
    match outcome {
        DeleteOutcome::Deleted | DeleteOutcome::Reseeded => {
            if app
                .pending
                .as_ref()
                .is_some_and(|p| p.target.message_id() == id)
            {
                drop_pending(app);
            }
            app.status_message = "Message deleted".to_string();
            Effect::SaveChat
        }
        DeleteOutcome::GreetingProtected => {
            app.status_message = "The greeting can't be deleted".to_string();
            Effect::None
        }
        DeleteOutcome::NotFound => Effect::None,
    }
}

fn regenerate(app: &mut App, id: String) -> Effect {
    let Some(message) = app.store.get(&id) else {
        warn!("Regenerate: no message with id {id}");
        return Effect::None;
    };
    if message.is_user_message || message.is_system || !message.is_text() {
        app.status_message = "Only character replies can be regenerated".to_string();
        return Effect::None;
    }
    if app.is_loading {
        app.status_message = format!("Wait for {} to finish replying", app.character.name);
        return Effect::None;
    }
    start_generation(app, GenerationTarget::Variation(id))
}

fn start_generation(app: &mut App, target: GenerationTarget) -> Effect {
    let messages = app.store.messages();
    let history = match &target {
        GenerationTarget::Reply(_) => messages,
        GenerationTarget::Variation(id) => {
            let end = app.store.position(id).unwrap_or(messages.len());
            &messages[..end]
        }
    };
    let context = build_context(&app.prompt(), history);

    app.last_request_id += 1;
    let request_id = app.last_request_id;
    debug!("Starting generation {request_id} for {target:?}");

    app.pending = Some(PendingGeneration { request_id, target });
    app.is_loading = true;
    app.status_message = format!("{} is typing...", app.character.name);

    Effect::SpawnGeneration(GenerationJob {
        request_id,
        context,
        model: app.model_name.clone(),
        mode: app.mode,
        max_output_tokens: app.max_output_tokens,
    })
}

fn finish(app: &mut App, request_id: u64, result: Result<String, String>) -> Effect {
    let pending = match app.pending.take() {
        Some(p) if p.request_id == request_id => p,
        other => {
            debug!("Ignoring stale generation result {request_id}");
            app.pending = other;
            return Effect::None;
        }
    };
    app.is_loading = false;

    match result {
        Ok(text) => {
            match pending.target {
                GenerationTarget::Reply(prompt_id) => {
                    if !app.store.contains(&prompt_id) {
                        debug!("Discarding reply to deleted message {prompt_id}");
                        app.status_message = "That message was deleted".to_string();
                        return Effect::None;
                    }
                    app.store
                        .append(Message::character(&app.character.name, text));
                }
                GenerationTarget::Variation(id) => {
                    if !app.store.push_variation(&id, text) {
                        app.status_message = "That message was deleted".to_string();
                        return Effect::None;
                    }
                }
            }
            app.notifier.reply_received(&app.character.name);
            app.status_message = format!("Chatting with {}", app.character.name);
        }
        Err(reason) => {
            warn!("Generation {request_id} failed: {reason}");
            app.store.append(Message::system(GENERATION_FAILED_TEXT));
            app.status_message = "Generation failed".to_string();
        }
    }
    Effect::SaveChat
}

fn drop_pending(app: &mut App) {
    if let Some(p) = app.pending.take() {
        debug!("Dropping pending generation {}", p.request_id);
    }
    app.is_loading = false;
}
