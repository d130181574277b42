//! # Application State
//!
//! Core business state for a chat. This module contains domain logic only,
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── provider: Arc<dyn CompletionProvider>  // LLM provider
//! ├── safety: Arc<dyn SafetyCheck>           // input screening
//! ├── notifier: Arc<dyn Notifier>            // reply notifications
//! ├── character: Character                   // who we are talking to
//! ├── persona: Persona                       // who the user plays
//! ├── store: MessageStore                    // the conversation
//! ├── mode: ReplyMode                        // casual / roleplay / story
//! ├── segment_options: SegmentOptions        // renderer segmentation switches
//! ├── status_message: String                 // status bar text
//! ├── is_loading: bool                       // a generation is outstanding
//! ├── pending: Option<PendingGeneration>     // which request we are waiting for
//! └── current_chat_id: Option<String>        // None = unsaved new chat
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use crate::core::character::{Character, Persona};
use crate::core::config::ResolvedConfig;
use crate::core::notify::{BellNotifier, Notifier, SilentNotifier};
use crate::core::safety::{KeywordFilter, SafetyCheck};
use crate::core::segment::SegmentOptions;
use crate::core::store::MessageStore;
use crate::inference::prompt::Prompt;
use crate::inference::{CompletionProvider, ReplyMode};

/// What a finished generation will be applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationTarget {
    /// A new character message answering the user message with this id.
    Reply(String),
    /// A new alternative for the message with this id.
    Variation(String),
}

impl GenerationTarget {
    /// The message the result depends on. Deleting it voids the generation.
    pub fn message_id(&self) -> &str {
        match self {
            GenerationTarget::Reply(id) | GenerationTarget::Variation(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub request_id: u64,
    pub target: GenerationTarget,
}

pub struct App {
    pub provider: Arc<dyn CompletionProvider>,
    pub safety: Arc<dyn SafetyCheck>,
    pub notifier: Arc<dyn Notifier>,
    pub character: Character,
    pub persona: Persona,
    pub store: MessageStore,
    pub mode: ReplyMode,
    pub model_name: String,
    pub max_output_tokens: u32,
    /// User-configured instructions appended to the directive.
    pub system_prompt: Option<String>,
    pub segment_options: SegmentOptions,
    pub status_message: String,
    pub is_loading: bool,
    pub pending: Option<PendingGeneration>,
    /// Last issued request id; ids only grow so stale results never match.
    pub last_request_id: u64,
    pub current_chat_id: Option<String>,
}

impl App {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        character: Character,
        persona: Persona,
        model_name: String,
    ) -> Self {
        let store = MessageStore::initialize(&character, Vec::new());
        Self {
            provider,
            safety: Arc::new(KeywordFilter::default()),
            notifier: Arc::new(SilentNotifier),
            status_message: format!("Chatting with {}", character.name),
            character,
            persona,
            store,
            mode: ReplyMode::default(),
            model_name,
            max_output_tokens: crate::core::config::DEFAULT_MAX_OUTPUT_TOKENS,
            system_prompt: None,
            segment_options: SegmentOptions::default(),
            is_loading: false,
            pending: None,
            last_request_id: 0,
            current_chat_id: None,
        }
    }

    /// Build the app from resolved settings. The safety filter and notifier
    /// are created here, once, and shared from then on.
    pub fn from_config(
        provider: Arc<dyn CompletionProvider>,
        character: Character,
        config: &ResolvedConfig,
    ) -> Self {
        let notifier: Arc<dyn Notifier> = if config.bell {
            Arc::new(BellNotifier)
        } else {
            Arc::new(SilentNotifier)
        };
        Self {
            safety: Arc::new(KeywordFilter::new(config.blocked_terms.clone())),
            notifier,
            mode: config.mode,
            max_output_tokens: config.max_output_tokens,
            system_prompt: config.system_prompt.clone(),
            segment_options: SegmentOptions {
                resolve_overlaps: config.resolve_overlaps,
            },
            ..Self::new(
                provider,
                character,
                config.persona.clone(),
                config.model_name.clone(),
            )
        }
    }

    pub fn prompt(&self) -> Prompt<'_> {
        Prompt {
            character: &self.character,
            persona: &self.persona,
            mode: self.mode,
            extra_instructions: self.system_prompt.as_deref(),
        }
    }

    /// Id of the message a pending variation will land on, if any.
    pub fn pending_variation_target(&self) -> Option<&str> {
        match &self.pending {
            Some(PendingGeneration {
                target: GenerationTarget::Variation(id),
                ..
            }) => Some(id),
            _ => None,
        }
    }
}
