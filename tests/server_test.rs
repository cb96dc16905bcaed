//! HTTP surface tests driven through `tower::ServiceExt::oneshot`

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use omegatron::prelude::*;
use omegatron::server::app;
use omegatron::types::{ErrorEnvelope, ModelsResponse};
use serde_json::{Value, json};
use std::sync::Arc;
use support::{Behavior, MockAdapter, fast_options, reasoning_result, router};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    let router = router(
        vec![
            MockAdapter::new(
                "thinker",
                &["reasoner"],
                Behavior::Complete(reasoning_result("Hmm.", "Hello there")),
            ),
            MockAdapter::new("silent", &["quiet"], Behavior::Stream(Vec::new())),
            MockAdapter::new(
                "down",
                &["down-model"],
                Behavior::Fail(ProviderError::timeout("down", "too slow")),
            ),
        ],
        fast_options(),
    );
    app(Arc::new(router))
}

async fn send(request: Request<Body>) -> (StatusCode, String) {
    let response = test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn post_json(body: Value) -> Request<Body> {
    Request::post("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `data:` payloads of an SSE body
fn sse_data(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.trim_start().to_string())
        .collect()
}

#[tokio::test]
async fn lists_models_sorted_with_owner() {
    let (status, body) = send(Request::get("/v1/models").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let models: ModelsResponse = serde_json::from_str(&body).unwrap();
    let ids: Vec<_> = models.data.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["down-model", "quiet", "reasoner"]);
    assert_eq!(models.data[2].owned_by, "thinker");
    assert_eq!(models.data[2].object, "model");
}

#[tokio::test]
async fn health_reports_providers() {
    let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["total_models"], 3);
    assert_eq!(health["providers"], json!(["thinker", "silent", "down"]));
}

#[tokio::test]
async fn root_describes_the_service() {
    let (status, body) = send(Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let info: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(info["name"], "omegatron");
    assert_eq!(info["total_models"], 3);
    assert!(
        info["endpoints"]
            .as_array()
            .unwrap()
            .contains(&json!("POST /v1/chat/completions"))
    );
}

#[tokio::test]
async fn non_streaming_completion() {
    let (status, body) = send(post_json(json!({
        "model": "reasoner",
        "messages": [{"role": "user", "content": "hi"}]
    })))
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: ChatCompletionResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.object, "chat.completion");
    assert_eq!(response.model, "reasoner");
    assert_eq!(
        response.content(),
        Some("<thinking>\nHmm.\n</thinking>\n\nHello there")
    );
    assert_eq!(response.choices[0].finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn streaming_completion_is_sse_terminated_by_done() {
    let request = post_json(json!({
        "model": "reasoner",
        "messages": [{"role": "user", "content": "hi"}],
        "stream": true
    }));
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let data = sse_data(std::str::from_utf8(&bytes).unwrap());
    assert_eq!(data.last().map(String::as_str), Some("[DONE]"));

    let chunks: Vec<ChatCompletionChunk> = data[..data.len() - 1]
        .iter()
        .map(|d| serde_json::from_str(d).unwrap())
        .collect();
    let content: String = chunks.iter().filter_map(|c| c.content()).collect();
    assert_eq!(content, "<thinking>\nHmm.\n</thinking>\n\nHello there");
    assert!(chunks.iter().all(|c| c.object == "chat.completion.chunk"));
    assert!(chunks.last().unwrap().is_terminal());
}

#[tokio::test]
async fn unknown_model_is_a_400_envelope() {
    let (status, body) = send(post_json(json!({
        "model": "nope",
        "messages": [{"role": "user", "content": "hi"}]
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope.error.code, "model_not_found");
    assert_eq!(envelope.error.r#type, "invalid_request_error");
}

#[tokio::test]
async fn malformed_body_is_a_400_envelope() {
    let request = Request::post("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope.error.code, "invalid_request");
}

#[tokio::test]
async fn upstream_timeout_is_a_504_envelope() {
    let (status, body) = send(post_json(json!({
        "model": "down-model",
        "messages": [{"role": "user", "content": "hi"}]
    })))
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope.error.code, "upstream_timeout");
}

#[tokio::test]
async fn empty_upstream_stream_still_terminates() {
    let (status, body) = send(post_json(json!({
        "model": "quiet",
        "messages": [{"role": "user", "content": "hi"}],
        "stream": true
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = sse_data(&body);
    // role increment, terminal increment, [DONE]
    assert_eq!(data.len(), 3);
    assert_eq!(data[2], "[DONE]");
}

#[tokio::test]
async fn unknown_route_is_a_404_envelope() {
    let (status, body) = send(Request::get("/v2/nothing").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope.error.code, "not_found");
}
