pub mod prompt;
pub mod provider;
pub mod providers;
pub mod types;

pub use prompt::build_context;
pub use provider::{CompletionProvider, CompletionRequest, ProviderError, collect_reply};
pub use providers::{LmStudioProvider, OpenRouterProvider};
pub use types::{Context, ContextSegment, ReplyMode, Source, StreamChunk, normalize_typography};
