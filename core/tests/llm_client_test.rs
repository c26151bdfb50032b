mod common;

use common::{serve_canned, serve_silent};
use henhouse_core::llm::{ChatModel, Turn};
use henhouse_core::{Error, LlmClient, LlmClientConfig, ModelReply, ToolKind};
use serde_json::json;
use std::time::Duration;

fn client(base_url: String) -> LlmClient {
    LlmClient::with_http(
        reqwest::Client::new(),
        LlmClientConfig {
            base_url,
            model: "test-model".into(),
            api_key: Some("k".into()),
            request_timeout_ms: None,
            temperature: 0.0,
        },
    )
}

#[tokio::test]
async fn error_status_is_a_model_error() {
    let base = serve_canned(500, r#"{"error":"overloaded"}"#).await;
    let err = client(base)
        .respond(&[Turn::user("hi")], &[ToolKind::WebSearch.spec()])
        .await
        .unwrap_err();
    match err {
        Error::Model(msg) => {
            assert!(msg.contains("500"), "msg: {msg}");
            assert!(msg.contains("overloaded"), "msg: {msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn tool_call_reply_is_parsed() {
    let base = serve_canned(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"","tool_calls":[{"id":"call_9","type":"function","function":{"name":"web_search","arguments":"{\"query\":\"silkie\"}"}}]}}]}"#,
    )
    .await;
    let reply = client(base)
        .respond(&[Turn::user("research")], &[ToolKind::WebSearch.spec()])
        .await
        .unwrap();

    match reply {
        ModelReply::ToolCall(call) => {
            assert_eq!(call.id.as_deref(), Some("call_9"));
            assert_eq!(call.name, "web_search");
            assert_eq!(call.arguments, json!({"query": "silkie"}));
        }
        other => panic!("expected a tool call, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_turn_returns_text() {
    let base = serve_canned(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"- Hens purr https://example.com"}}]}"#,
    )
    .await;
    let text = client(base)
        .respond_without_tools(&[Turn::user("answer")])
        .await
        .unwrap();
    assert_eq!(text, "- Hens purr https://example.com");
}

#[tokio::test]
async fn plain_turn_without_content_is_blank() {
    let base = serve_canned(200, r#"{"choices":[{"message":{"role":"assistant"}}]}"#).await;
    let text = client(base)
        .respond_without_tools(&[Turn::user("answer")])
        .await
        .unwrap();
    assert_eq!(text, "");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_model_error() {
    // Port 9 on loopback: nothing listens there
    let err = client("http://127.0.0.1:9".into())
        .respond_without_tools(&[Turn::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Model(_)));
}

#[tokio::test]
async fn configured_timeout_applies_to_a_shared_http_client() {
    let base = serve_silent().await;
    let model = LlmClient::with_http(
        reqwest::Client::new(),
        LlmClientConfig {
            request_timeout_ms: Some(200),
            ..client(base).config().clone()
        },
    );

    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        model.respond_without_tools(&[Turn::user("hi")]),
    )
    .await
    .expect("request should time out on its own");
    assert!(matches!(outcome, Err(Error::Model(_))));
}
