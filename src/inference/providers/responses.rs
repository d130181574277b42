//! Responses API wire types and stream handling shared by the providers.
//!
//! This module uses OpenAI Responses API terminology:
//! - "input" (array of messages, not "context")
//! - "role" (not "source")
//! - SSE events: response.output_text.delta, response.reasoning_summary_text.delta

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use super::sse::{DeltaEvent, SseDecoder};
use crate::inference::{CompletionRequest, Context, ProviderError, Source, StreamChunk};

/// Role in an input message (OpenAI terminology)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the input array
#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct InputMessage {
    #[serde(rename = "type")]
    item_type: &'static str, // always "message"
    pub role: Role,
    pub content: String,
}

/// The request body for the Responses API
#[derive(Serialize, Debug)]
pub(crate) struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ResponsesRequest {
    pub fn streaming(request: &CompletionRequest<'_>) -> Self {
        Self {
            model: request.model.to_string(),
            input: context_to_input(request.context),
            stream: Some(true),
            temperature: request.mode.temperature(),
            max_output_tokens: request.max_output_tokens,
        }
    }
}

/// Converts a Context into Responses API input format.
pub(crate) fn context_to_input(context: &Context) -> Vec<InputMessage> {
    context
        .items
        .iter()
        .map(|seg| InputMessage {
            item_type: "message",
            role: match seg.source {
                Source::Directive => Role::System,
                Source::User => Role::User,
                Source::Model => Role::Assistant,
            },
            content: seg.content.clone(),
        })
        .collect()
}

/// Turn a non-2xx response into `ProviderError::Api`.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    debug!("{} response status: {}", provider, response.status());
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let err_body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!("{} API error: {} - {}", provider, status, err_body);
    Err(ProviderError::Api {
        status,
        message: err_body,
    })
}

async fn send(sender: &Sender<StreamChunk>, chunk: StreamChunk) -> Result<(), ProviderError> {
    sender.send(chunk).await.map_err(|_| {
        warn!("Chunk send failed: receiver dropped");
        ProviderError::ChannelClosed
    })
}

/// Read the SSE body to the end, forwarding text and reasoning deltas.
pub(crate) async fn forward_stream(
    mut response: reqwest::Response,
    sender: &Sender<StreamChunk>,
) -> Result<(), ProviderError> {
    let mut decoder = SseDecoder::default();
    let mut total_content_len = 0usize;
    let mut chunk_count = 0usize;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?
    {
        debug!("Raw chunk received: {} bytes", chunk.len());

        for event in decoder.feed(&chunk) {
            match event.event_type.as_deref() {
                Some("response.output_text.delta") => {
                    if let Ok(delta) = serde_json::from_str::<DeltaEvent>(&event.data)
                        && !delta.delta.is_empty()
                    {
                        chunk_count += 1;
                        total_content_len += delta.delta.len();
                        send(sender, StreamChunk::Content(delta.delta)).await?;
                    }
                }
                Some("response.reasoning_summary_text.delta")
                | Some("response.reasoning_text.delta") => {
                    if let Ok(delta) = serde_json::from_str::<DeltaEvent>(&event.data)
                        && !delta.delta.is_empty()
                    {
                        chunk_count += 1;
                        send(sender, StreamChunk::Thinking(delta.delta)).await?;
                    }
                }
                Some("response.completed") => {
                    info!(
                        "Stream complete: {} chunks, {} content bytes",
                        chunk_count, total_content_len
                    );
                    send(sender, StreamChunk::Completed).await?;
                    return Ok(());
                }
                Some(other) => {
                    // response.created, response.in_progress, etc.
                    debug!("Ignoring event type '{}': {} bytes", other, event.data.len());
                }
                None => {
                    debug!("Data without event type: {}", event.data);
                }
            }
        }
    }

    info!(
        "Stream ended: {} chunks processed, {} total content bytes",
        chunk_count, total_content_len
    );
    Ok(())
}
