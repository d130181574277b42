use std::fmt;

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc::{self, Sender};

use super::types::{Context, ReplyMode, StreamChunk, normalize_typography};

/// Errors that can occur during provider operations.
/// Variants carry enough info to determine retryability (future use).
#[derive(Debug)]
pub enum ProviderError {
    /// Provider misconfigured (missing API key, bad URL). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused). Retryable.
    Network(String),
    /// API returned an error response. Retryable if status >= 500 or 429.
    Api { status: u16, message: String },
    /// Failed to parse the provider's response. Not retryable.
    Parse(String),
    /// The mpsc channel was closed (receiver dropped). Not retryable.
    ChannelClosed,
    /// The stream finished without any reply text. Retryable.
    EmptyResponse,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
            ProviderError::Network(msg) => write!(f, "network error: {msg}"),
            ProviderError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ProviderError::Parse(msg) => write!(f, "parse error: {msg}"),
            ProviderError::ChannelClosed => write!(f, "channel closed"),
            ProviderError::EmptyResponse => write!(f, "empty response"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Everything a provider needs to fulfill a completion request.
pub struct CompletionRequest<'a> {
    pub context: &'a Context,
    pub model: &'a str,
    pub mode: ReplyMode,
    pub max_output_tokens: Option<u32>,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Streams a completion based on the given request, sending chunks to the provided channel.
    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError>;
}

/// Run a streaming completion to the end and return the whole reply,
/// trimmed and typography-normalized. Thinking chunks are discarded.
pub async fn collect_reply(
    provider: &dyn CompletionProvider,
    request: CompletionRequest<'_>,
) -> Result<String, ProviderError> {
    let (tx, mut rx) = mpsc::channel::<StreamChunk>(100);

    let collect = async move {
        let mut reply = String::new();
        let mut thinking_len = 0usize;
        while let Some(chunk) = rx.recv().await {
            match chunk {
                StreamChunk::Content(text) => reply.push_str(&text),
                StreamChunk::Thinking(text) => thinking_len += text.len(),
                StreamChunk::Completed => {}
            }
        }
        debug!(
            "Collected reply: {} content bytes, {} thinking bytes",
            reply.len(),
            thinking_len
        );
        reply
    };

    let (result, reply) = tokio::join!(provider.stream_completion(request, tx), collect);
    result?;

    let reply = normalize_typography(reply.trim());
    if reply.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(reply)
}
