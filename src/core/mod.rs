//! # Core Application Logic
//!
//! Hearth's business logic. It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │                         │
//!                    │  No UI. Pure reducer.   │
//!                    └───────────┬─────────────┘
//!                                │
//!                                ▼
//!                         ┌────────────┐
//!                         │    TUI     │
//!                         │  Adapter   │
//!                         │ (ratatui)  │
//!                         └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all chat state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`message`] / [`store`]: the message record and the ordered list holding them
//! - [`segment`]: roleplay text → typed segments
//! - [`variation`]: browsing and adding alternative replies
//! - [`chats`]: recent-chat persistence
//! - [`character`], [`config`], [`safety`], [`notify`], [`debounce`]: collaborators

pub mod action;
pub mod character;
pub mod chats;
pub mod config;
pub mod debounce;
pub mod message;
pub mod notify;
pub mod safety;
pub mod segment;
pub mod state;
pub mod store;
pub mod variation;
