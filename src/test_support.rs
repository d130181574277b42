//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::core::character::{Character, Persona};
use crate::core::state::App;
use crate::inference::{CompletionProvider, CompletionRequest, ProviderError, StreamChunk};

/// A no-op provider for tests that don't need real API calls.
pub struct NoopProvider;

#[async_trait]
impl CompletionProvider for NoopProvider {
    fn name(&self) -> &str {
        "noop"
    }

    async fn stream_completion(
        &self,
        _request: CompletionRequest<'_>,
        _sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Luna with the short greeting used throughout the tests.
pub fn test_character() -> Character {
    Character {
        greeting: Some("Hello! I'm Luna.".to_string()),
        ..Character::companion()
    }
}

/// Creates a test App chatting with Luna as "Sam", with a NoopProvider.
pub fn test_app() -> App {
    let persona = Persona {
        name: "Sam".to_string(),
        description: String::new(),
    };
    App::new(
        Arc::new(NoopProvider),
        test_character(),
        persona,
        "test-model".to_string(),
    )
}
