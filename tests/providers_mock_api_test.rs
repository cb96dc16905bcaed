//! Provider adapters against wiremock upstreams
//!
//! Validates request shape, headers and the translation of each upstream's
//! reply into adapter output.

use futures::StreamExt;
use omegatron::config::ProviderConfig;
use omegatron::prelude::*;
use omegatron::providers::{
    CloudflareAdapter, FlowithAdapter, MinimaxAdapter, OivscodeAdapter, TypefullyAdapter,
};
use omegatron::retry::RetryPolicy;
use omegatron::stream::collect_chunks;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn conversation() -> CompletionRequest {
    CompletionRequest::new(
        "any",
        vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("What is 2+2?"),
        ],
    )
}

async fn complete_result(output: CompletionOutput) -> CompletionResult {
    match output {
        CompletionOutput::Complete(result) => result,
        CompletionOutput::Stream(stream) => collect_chunks(stream).await.expect("stream ok"),
    }
}

fn minimax_sse() -> String {
    [
        json!({"choices": [{"delta": {"role": "assistant", "reasoning_content": "Adding "}}]}),
        json!({"choices": [{"delta": {"reasoning_content": "two and two."}}]}),
        json!({"choices": [{"delta": {"content": "It is "}}]}),
        json!({"choices": [{"delta": {"content": "4."}}]}),
        json!({
            "choices": [{"delta": {}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 6, "total_tokens": 15},
            "base_resp": {"status_code": 0, "status_msg": ""}
        }),
    ]
    .iter()
    .map(|event| format!("data: {event}\n\n"))
    .chain(std::iter::once("data: [DONE]\n\n".to_string()))
    .collect()
}

fn minimax(server: &MockServer) -> MinimaxAdapter {
    MinimaxAdapter::new(
        reqwest::Client::new(),
        SecretString::from("test-key".to_string()),
    )
    .with_base_url(server.uri())
    .with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn minimax_streams_reasoning_separately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text/chatcompletion_v2"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "minimax-reasoning-01",
            "stream": true,
            "max_tokens": 40000,
            "top_p": 0.95
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(minimax_sse(), "text/event-stream"))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = minimax(&server);
    let binding = ProviderBinding::new("minimax", "minimax-reasoning-01");

    let output = adapter
        .complete(conversation().with_stream(true), &binding)
        .await
        .unwrap();
    let CompletionOutput::Stream(stream) = output else {
        panic!("streaming request should stream");
    };
    let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;
    assert_eq!(
        chunks,
        vec![
            CompletionChunk::reasoning("Adding "),
            CompletionChunk::reasoning("two and two."),
            CompletionChunk::content("It is "),
            CompletionChunk::content("4."),
            CompletionChunk::UsageUpdate {
                usage: Usage::new(9, 6)
            },
            CompletionChunk::end(FinishReason::Stop),
        ]
    );

    let output = adapter.complete(conversation(), &binding).await.unwrap();
    assert!(!output.is_stream());
    let result = complete_result(output).await;
    assert_eq!(result.reasoning(), "Adding two and two.");
    assert_eq!(result.text(), "It is 4.");
    assert_eq!(result.usage, Some(Usage::new(9, 6)));
}

#[tokio::test]
async fn minimax_base_resp_failure_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text/chatcompletion_v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_resp": {"status_code": 1004, "status_msg": "login fail"}
        })))
        .mount(&server)
        .await;

    let err = minimax(&server)
        .complete(
            conversation(),
            &ProviderBinding::new("minimax", "minimax-reasoning-01"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::UpstreamStatus);
    assert_eq!(err.provider, "minimax");
    assert!(err.message.contains("login fail"));
}

#[tokio::test]
async fn minimax_http_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = minimax(&server)
        .complete(
            conversation(),
            &ProviderBinding::new("minimax", "minimax-reasoning-01"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::UpstreamStatus);
    assert_eq!(err.upstream_status, Some(401));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn minimax_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(minimax_sse(), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = minimax(&server).with_retry(
        RetryPolicy::new()
            .with_max_attempts(2)
            .with_initial_delay(std::time::Duration::from_millis(1))
            .with_jitter(false),
    );
    let output = adapter
        .complete(
            conversation(),
            &ProviderBinding::new("minimax", "minimax-reasoning-01"),
        )
        .await
        .unwrap();
    assert_eq!(complete_result(output).await.text(), "It is 4.");
}

#[tokio::test]
async fn configured_max_attempts_counts_every_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        base_url: Some(server.uri()),
        api_key: Some(SecretString::from("test-key".to_string())),
        max_attempts: Some(3),
        ..ProviderConfig::default()
    };
    let adapter = MinimaxAdapter::from_config(reqwest::Client::new(), &config).unwrap();
    let err = adapter
        .complete(
            conversation(),
            &ProviderBinding::new("minimax", "minimax-reasoning-01"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status, Some(503));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 3);
}

#[tokio::test]
async fn oivscode_fails_over_to_a_healthy_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/down/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502))
        .expect(0..=1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/up/v1/chat/completions"))
        .and(header_exists("userid"))
        .and(body_partial_json(json!({"model": "gpt-4o", "stream": false})))
        .and(|req: &Request| {
            req.headers
                .get("userid")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|id| id.len() == 21 && id.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {"role": "assistant", "content": "Four."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OivscodeAdapter::new(reqwest::Client::new()).with_endpoints(vec![
        format!("{}/down/v1/chat/completions", server.uri()),
        format!("{}/up/v1/chat/completions", server.uri()),
    ]);
    let output = adapter
        .complete(
            conversation().with_stream(true),
            &ProviderBinding::new("oivscode", "gpt-4o"),
        )
        .await
        .unwrap();

    let CompletionOutput::Complete(result) = output else {
        panic!("oivscode answers in one piece");
    };
    assert_eq!(result.text(), "Four.");
    assert_eq!(result.usage, Some(Usage::new(12, 2)));
}

#[tokio::test]
async fn oivscode_reports_the_last_error_when_every_endpoint_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let adapter = OivscodeAdapter::new(reqwest::Client::new()).with_endpoints(
        (0..3)
            .map(|i| format!("{}/e{i}/v1/chat/completions", server.uri()))
            .collect(),
    );
    let err = adapter
        .complete(conversation(), &ProviderBinding::new("oivscode", "gpt-4"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::UpstreamStatus);
    assert_eq!(err.upstream_status, Some(500));
}

#[tokio::test]
async fn oivscode_does_not_fail_over_on_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OivscodeAdapter::new(reqwest::Client::new()).with_endpoints(
        (0..4)
            .map(|i| format!("{}/e{i}/v1/chat/completions", server.uri()))
            .collect(),
    );
    let err = adapter
        .complete(conversation(), &ProviderBinding::new("oivscode", "gpt-4"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::UpstreamStatus);
    assert_eq!(err.upstream_status, Some(400));
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn cloudflare_reads_the_data_stream() {
    let server = MockServer::start().await;
    let body = concat!(
        "f:{\"messageId\":\"msg-1\"}\n",
        "g:\"Two plus two.\"\n",
        "0:\"The answer\"\n",
        "0:\" is 4.\"\n",
        "e:{\"finishReason\":\"stop\"}\n",
        "d:{\"finishReason\":\"stop\",\"usage\":{\"promptTokens\":10,\"completionTokens\":5}}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/inference"))
        .and(body_partial_json(json!({
            "model": "@cf/meta/llama-3-8b-instruct",
            "max_tokens": 600,
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain; charset=utf-8"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = CloudflareAdapter::new(reqwest::Client::new())
        .with_base_url(format!("{}/api/inference", server.uri()))
        .with_retry(RetryPolicy::none());
    let output = adapter
        .complete(
            conversation(),
            &ProviderBinding::new("cloudflare", "@cf/meta/llama-3-8b-instruct"),
        )
        .await
        .unwrap();

    let result = complete_result(output).await;
    assert_eq!(result.reasoning(), "Two plus two.");
    assert_eq!(result.text(), "The answer is 4.");
    assert_eq!(result.usage, Some(Usage::new(10, 5)));
    assert_eq!(result.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn typefully_sends_a_flattened_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/completion"))
        .and(body_partial_json(json!({
            "prompt": "What is 2+2?",
            "systemPrompt": "Be brief.",
            "modelIdentifier": "anthropic:claude-3-5-haiku-20241022",
            "outputLength": 600
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("0:\"Four\"\n0:\".\"\n", "text/plain"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let adapter = TypefullyAdapter::new(reqwest::Client::new())
        .with_base_url(format!("{}/completion", server.uri()))
        .with_retry(RetryPolicy::none());
    let output = adapter
        .complete(
            conversation().with_stream(true),
            &ProviderBinding::new("typefully", "anthropic:claude-3-5-haiku-20241022"),
        )
        .await
        .unwrap();
    assert!(output.is_stream());

    let result = complete_result(output).await;
    assert_eq!(result.text(), "Four.");
    assert!(!result.has_reasoning());
}

#[tokio::test]
async fn flowith_streams_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/chat"))
        .and(query_param("mode", "general"))
        .and(body_partial_json(json!({
            "model": "kimi-k2",
            "stream": true,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "What is 2+2?"}
            ]
        })))
        .and(|req: &Request| {
            serde_json::from_slice::<serde_json::Value>(&req.body)
                .ok()
                .and_then(|v| v["nodeId"].as_str().map(|id| uuid::Uuid::parse_str(id).is_ok()))
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(200).set_body_raw("2 + 2 = 4, naïvely.", "text/plain"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = FlowithAdapter::new(reqwest::Client::new())
        .with_base_url(server.uri())
        .with_retry(RetryPolicy::none());
    let output = adapter
        .complete(
            conversation(),
            &ProviderBinding::new("flowith", "kimi-k2"),
        )
        .await
        .unwrap();

    let result = complete_result(output).await;
    assert_eq!(result.text(), "2 + 2 = 4, naïvely.");
}
