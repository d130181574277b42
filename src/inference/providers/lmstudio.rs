//! LM Studio provider implementation using the Responses API.
//!
//! LM Studio v0.3.29+ serves `/v1/responses` with SSE streaming. It is a
//! local server, so requests carry no credentials.

use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc::Sender;

use super::responses::{ResponsesRequest, check_status, forward_stream};
use crate::inference::{CompletionProvider, CompletionRequest, ProviderError, StreamChunk};

/// LM Studio API provider using Responses API (local inference server)
pub struct LmStudioProvider {
    base_url: String,
    client: reqwest::Client,
}

impl LmStudioProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let body = ResponsesRequest::streaming(&request);

        info!(
            "LM Studio Responses API request: model={}, input_count={}, mode={:?}",
            request.model,
            body.input.len(),
            request.mode
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status("LM Studio", response).await?;
        forward_stream(response, &sender).await
    }
}
