use hearth::inference::{
    CompletionProvider, CompletionRequest, Context, LmStudioProvider, OpenRouterProvider,
    ProviderError, ReplyMode, Source, StreamChunk, collect_reply,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

fn create_test_context() -> Context {
    let mut context = Context::with_directive("You are Luna.");
    context.add(Source::User, "Hello");
    context
}

fn request(context: &Context) -> CompletionRequest<'_> {
    CompletionRequest {
        context,
        model: "test-model",
        mode: ReplyMode::Roleplay,
        max_output_tokens: None,
    }
}

/// Content chunks, thinking chunks, and whether `Completed` arrived.
async fn collect_chunks(mut receiver: mpsc::Receiver<StreamChunk>) -> (Vec<String>, Vec<String>, bool) {
    let mut content = Vec::new();
    let mut thinking = Vec::new();
    let mut completed = false;

    while let Some(chunk) = receiver.recv().await {
        match chunk {
            StreamChunk::Content(s) => content.push(s),
            StreamChunk::Thinking(s) => thinking.push(s),
            StreamChunk::Completed => completed = true,
        }
    }

    (content, thinking, completed)
}

async fn mount_sse(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

const HELLO_WORLD: &str = "\
event: response.created
data: {\"type\":\"response.created\"}

event: response.output_text.delta
data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hello\"}

event: response.output_text.delta
data: {\"type\":\"response.output_text.delta\",\"delta\":\" world\"}

event: response.completed
data: {\"type\":\"response.completed\"}
";

// ============================================================================
// OpenRouter Provider Tests
// ============================================================================

#[tokio::test]
async fn test_openrouter_streams_content_and_completes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HELLO_WORLD))
        .mount(&mock_server)
        .await;

    let provider = OpenRouterProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let context = create_test_context();

    let (tx, rx) = mpsc::channel(100);
    let result = provider.stream_completion(request(&context), tx).await;
    assert!(result.is_ok());

    let (content, thinking, completed) = collect_chunks(rx).await;
    assert_eq!(content, vec!["Hello", " world"]);
    assert!(thinking.is_empty());
    assert!(completed);
}

#[tokio::test]
async fn test_openrouter_sends_mode_temperature_and_token_cap() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": true,
            "temperature": 1.0,
            "max_output_tokens": 300,
            "input": [
                {"type": "message", "role": "system", "content": "You are Luna."},
                {"type": "message", "role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(HELLO_WORLD))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenRouterProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let context = create_test_context();
    let request = CompletionRequest {
        context: &context,
        model: "test-model",
        mode: ReplyMode::Story,
        max_output_tokens: Some(300),
    };

    let reply = collect_reply(&provider, request).await.unwrap();
    assert_eq!(reply, "Hello world");
}

#[tokio::test]
async fn test_openrouter_forwards_reasoning_as_thinking() {
    let mock_server = MockServer::start().await;
    mount_sse(
        &mock_server,
        "\
event: response.reasoning_summary_text.delta
data: {\"type\":\"response.reasoning_summary_text.delta\",\"delta\":\"Hmm...\"}

event: response.output_text.delta
data: {\"type\":\"response.output_text.delta\",\"delta\":\"*smiles*\"}

event: response.completed
data: {\"type\":\"response.completed\"}
",
    )
    .await;

    let provider = OpenRouterProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let context = create_test_context();

    let (tx, rx) = mpsc::channel(100);
    provider.stream_completion(request(&context), tx).await.unwrap();

    let (content, thinking, _) = collect_chunks(rx).await;
    assert_eq!(content, vec!["*smiles*"]);
    assert_eq!(thinking, vec!["Hmm..."]);
}

#[tokio::test]
async fn test_openrouter_api_error_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let provider = OpenRouterProvider::new("invalid-key".to_string(), Some(mock_server.uri()));
    let context = create_test_context();

    let result = collect_reply(&provider, request(&context)).await;
    match result {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_openrouter_empty_key_fails_without_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = OpenRouterProvider::new("  ".to_string(), Some(mock_server.uri()));
    let context = create_test_context();

    let result = collect_reply(&provider, request(&context)).await;
    assert!(matches!(result, Err(ProviderError::Config(_))));
}

#[tokio::test]
async fn test_openrouter_channel_closed_error() {
    let mock_server = MockServer::start().await;
    mount_sse(&mock_server, HELLO_WORLD).await;

    let provider = OpenRouterProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let context = create_test_context();

    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let result = provider.stream_completion(request(&context), tx).await;
    assert!(matches!(result, Err(ProviderError::ChannelClosed)));
}

// ============================================================================
// LM Studio Provider Tests
// ============================================================================

#[tokio::test]
async fn test_lmstudio_streams_without_embedded_types() {
    let mock_server = MockServer::start().await;
    mount_sse(
        &mock_server,
        "\
event: response.created
data: {\"id\":\"test\"}

event: response.output_text.delta
data: {\"delta\":\"Hello\"}

event: response.output_text.delta
data: {\"delta\":\" from LM Studio\"}

event: response.completed
data: {\"id\":\"test\"}
",
    )
    .await;

    let provider = LmStudioProvider::new(mock_server.uri());
    let context = create_test_context();

    let (tx, rx) = mpsc::channel(100);
    provider.stream_completion(request(&context), tx).await.unwrap();

    let (content, thinking, completed) = collect_chunks(rx).await;
    assert_eq!(content, vec!["Hello", " from LM Studio"]);
    assert!(thinking.is_empty());
    assert!(completed);
}

#[tokio::test]
async fn test_lmstudio_sends_no_authorization() {
    let mock_server = MockServer::start().await;
    mount_sse(&mock_server, HELLO_WORLD).await;

    let provider = LmStudioProvider::new(mock_server.uri());
    let context = create_test_context();
    collect_reply(&provider, request(&context)).await.unwrap();

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_lmstudio_ignores_unknown_events() {
    let mock_server = MockServer::start().await;
    mount_sse(
        &mock_server,
        "\
event: response.in_progress
data: {\"status\":\"working\"}

event: response.output_text.delta
data: {\"delta\":\"Text\"}

event: response.metadata
data: {\"usage\":100}

event: response.completed
data: {\"id\":\"test\"}
",
    )
    .await;

    let provider = LmStudioProvider::new(mock_server.uri());
    let context = create_test_context();

    let (tx, rx) = mpsc::channel(100);
    provider.stream_completion(request(&context), tx).await.unwrap();

    let (content, thinking, _) = collect_chunks(rx).await;
    assert_eq!(content, vec!["Text"]);
    assert!(thinking.is_empty());
}

// ============================================================================
// collect_reply
// ============================================================================

#[tokio::test]
async fn test_collect_reply_trims_and_normalizes_quotes() {
    let mock_server = MockServer::start().await;
    mount_sse(
        &mock_server,
        "\
event: response.output_text.delta
data: {\"delta\":\"  *waves* \u{201c}Hi!\u{201d}\"}

event: response.output_text.delta
data: {\"delta\":\" I\u{2019}m here\u{2026}  \"}

event: response.completed
data: {}
",
    )
    .await;

    let provider = LmStudioProvider::new(mock_server.uri());
    let context = create_test_context();

    let reply = collect_reply(&provider, request(&context)).await.unwrap();
    assert_eq!(reply, "*waves* \"Hi!\" I\u{2019}m here...");
}

#[tokio::test]
async fn test_collect_reply_rejects_blank_output() {
    let mock_server = MockServer::start().await;
    mount_sse(
        &mock_server,
        "\
event: response.reasoning_text.delta
data: {\"delta\":\"thinking only\"}

event: response.output_text.delta
data: {\"delta\":\"   \"}

event: response.completed
data: {}
",
    )
    .await;

    let provider = LmStudioProvider::new(mock_server.uri());
    let context = create_test_context();

    let result = collect_reply(&provider, request(&context)).await;
    assert!(matches!(result, Err(ProviderError::EmptyResponse)));
}

#[tokio::test]
async fn test_collect_reply_every_mode_succeeds() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HELLO_WORLD))
        .expect(3)
        .mount(&mock_server)
        .await;

    let provider = LmStudioProvider::new(mock_server.uri());
    let context = create_test_context();

    for mode in [ReplyMode::Casual, ReplyMode::Roleplay, ReplyMode::Story] {
        let request = CompletionRequest {
            mode,
            ..request(&context)
        };
        let reply = collect_reply(&provider, request).await;
        assert_eq!(reply.as_deref().ok(), Some("Hello world"), "mode {mode:?}");
    }
}
