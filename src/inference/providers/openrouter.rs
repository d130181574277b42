//! OpenRouter provider implementation using the Responses API.

use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc::Sender;

use super::responses::{ResponsesRequest, check_status, forward_stream};
use crate::inference::{CompletionProvider, CompletionRequest, ProviderError, StreamChunk};

/// OpenRouter API provider using Responses API
pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    /// Creates a new OpenRouter provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenRouter API key
    /// * `base_url` - Optional custom base URL (defaults to OpenRouter's API)
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::Config("OpenRouter API key is empty".to_string()));
        }

        // The Responses API is stateless here: the full context goes out
        // every turn.
        let body = ResponsesRequest::streaming(&request);

        info!(
            "OpenRouter Responses API request: model={}, input_count={}, mode={:?}",
            request.model,
            body.input.len(),
            request.mode,
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status("OpenRouter", response).await?;
        forward_stream(response, &sender).await
    }
}
