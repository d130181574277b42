//! # TUI Components
//!
//! ## Stateless components (props-based rendering)
//!
//! - `TitleBar`: character, reply mode, model and status
//! - `MessageCard`: one message in a bordered card
//!
//! ## Stateful components (event-driven)
//!
//! - `Composer`: the input field, also used to edit messages
//! - `MessageList`: virtualized, scrollable conversation view
//! - `ChatList`: the recent-chats overlay
//!
//! Each file holds the component's state, events, rendering and tests.
//! Components receive external data as props instead of reaching into
//! `App`, which keeps their dependencies explicit:
//!
//! ```rust,ignore
//! TitleBar { character_name: &app.character.name, .. }.render(frame, area);
//! ```
//!
//! ```text
//! components/
//! ├── mod.rs
//! ├── title_bar.rs
//! ├── message.rs       (MessageCard)
//! ├── message_list.rs
//! ├── composer.rs
//! └── chat_list.rs
//! ```

pub mod chat_list;
pub mod composer;
pub mod message;
pub mod message_list;
mod title_bar;

pub use chat_list::{ChatList, ChatListEvent, ChatListState};
pub use composer::{Composer, ComposerEvent};
pub use message::MessageCard;
pub use message_list::{MessageList, MessageListState};
pub use title_bar::TitleBar;
