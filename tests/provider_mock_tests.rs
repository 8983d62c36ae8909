//! Collaborator client tests against mocked HTTP backends.
//!
//! Verifies request shapes (paths, auth headers, payloads) and error
//! mapping for the generation client, the synthesis client, and the remote
//! prompt-configuration fetch.

use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use talkback_gateway::config::remote::{PromptConfig, PromptStore, RemoteConfigError};
use talkback_gateway::core::llm::{ChatCompletionClient, LlmConfig, LlmError, ResponseGenerator};
use talkback_gateway::core::tts::{
    DeepgramSynthesizer, SpeakError, SpeechSynthesizer, SynthesizerConfig,
};

fn llm_config(base_url: String) -> LlmConfig {
    LlmConfig {
        api_key: Some("test_openai_key".to_string()),
        base_url,
        timeout: Duration::from_secs(5),
    }
}

fn synth_config(base_url: String) -> SynthesizerConfig {
    SynthesizerConfig {
        api_key: Some("test_deepgram_key".to_string()),
        base_url,
        model: "aura-asteria-en".to_string(),
        timeout: Duration::from_secs(5),
    }
}

// =============================================================================
// Generation client
// =============================================================================

#[tokio::test]
async fn test_generation_request_shape_and_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test_openai_key"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "messages": [
                { "role": "system", "content": "Respond very briefly." },
                { "role": "user", "content": "what is 2+2" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "4" } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(reqwest::Client::new(), llm_config(server.uri()))
        .expect("client should build");
    let text = client
        .generate("Respond very briefly.", "gpt-4", "what is 2+2")
        .await
        .expect("generation should succeed");
    assert_eq!(text, "4");
}

#[tokio::test]
async fn test_generation_non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client =
        ChatCompletionClient::new(reqwest::Client::new(), llm_config(server.uri())).unwrap();
    let err = client
        .generate("Respond very briefly.", "gpt-4", "hello")
        .await
        .unwrap_err();
    match err {
        LlmError::Http { status, .. } => assert_eq!(status, 500),
        other => panic!("Expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_generation_malformed_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client =
        ChatCompletionClient::new(reqwest::Client::new(), llm_config(server.uri())).unwrap();
    let err = client
        .generate("Respond very briefly.", "gpt-4", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_generation_empty_choices_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client =
        ChatCompletionClient::new(reqwest::Client::new(), llm_config(server.uri())).unwrap();
    let err = client
        .generate("Respond very briefly.", "gpt-4", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

// =============================================================================
// Synthesis client
// =============================================================================

#[tokio::test]
async fn test_synthesis_streams_body_bytes_in_order() {
    let server = MockServer::start().await;

    let body: Vec<u8> = (0..1224u32).map(|i| (i % 251) as u8).collect();
    Mock::given(method("POST"))
        .and(path("/v1/speak"))
        .and(query_param("model", "aura-asteria-en"))
        .and(header("authorization", "Token test_deepgram_key"))
        .and(body_partial_json(json!({ "text": "4" })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let synth = DeepgramSynthesizer::new(reqwest::Client::new(), synth_config(server.uri()))
        .expect("synthesizer should build");
    let mut stream = synth.synthesize("4").await.expect("stream should open");

    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.expect("chunk should be ok"));
    }
    // Chunk boundaries are transport-dependent; the byte sequence is not.
    assert_eq!(received, body);
}

#[tokio::test]
async fn test_synthesis_non_success_fails_before_any_chunk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/speak"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let synth =
        DeepgramSynthesizer::new(reqwest::Client::new(), synth_config(server.uri())).unwrap();
    let err = synth.synthesize("hello").await.err().unwrap();
    match err {
        SpeakError::Http { status } => assert_eq!(status, 500),
        other => panic!("Expected Http error, got: {other:?}"),
    }
}

// =============================================================================
// Remote prompt configuration
// =============================================================================

fn prompt_store(url: Option<String>) -> PromptStore {
    PromptStore::new(
        PromptConfig {
            prompt: "Respond very briefly.".to_string(),
            model: "gpt-4".to_string(),
        },
        url,
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn test_prompt_reload_swaps_configuration() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prompt.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prompt": "Answer in one word.",
            "model": "gpt-4o"
        })))
        .mount(&server)
        .await;

    let store = prompt_store(Some(format!("{}/prompt.json", server.uri())));
    let reloaded = store.reload().await.expect("reload should succeed");
    assert_eq!(reloaded.prompt, "Answer in one word.");
    assert_eq!(reloaded.model, "gpt-4o");
    assert_eq!(store.get().model, "gpt-4o");
}

#[tokio::test]
async fn test_prompt_reload_failure_keeps_old_configuration() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prompt.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = prompt_store(Some(format!("{}/prompt.json", server.uri())));
    let err = store.reload().await.unwrap_err();
    assert!(matches!(err, RemoteConfigError::Http { status: 404 }));
    assert_eq!(store.get().model, "gpt-4");
}
