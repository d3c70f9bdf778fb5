//! OpenAI provider tests against a wiremock upstream.

mod common;

use relay_service::services::providers::openai::OpenAiProvider;
use relay_service::services::providers::{
    ChatMessage, CompletionProvider, FinishReason, GenerationParams, ProviderError, Usage,
};
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params() -> GenerationParams {
    GenerationParams {
        model: "gpt-4o-mini".to_string(),
        temperature: 0.2,
        max_tokens: 400,
    }
}

fn messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("Answer only from KNOWLEDGE."),
        ChatMessage::user("What is his current role?"),
    ]
}

fn credential() -> SecretString {
    SecretString::new(common::TEST_API_KEY.to_string())
}

fn provider(server: &MockServer, timeout: Duration) -> OpenAiProvider {
    OpenAiProvider::new(&format!("{}/v1", server.uri()), timeout).expect("Failed to build provider")
}

async fn complete_against(
    server: &MockServer,
    timeout: Duration,
) -> Result<relay_service::services::providers::Completion, ProviderError> {
    provider(server, timeout)
        .complete(&credential(), &messages(), &params())
        .await
}

#[tokio::test]
async fn sends_chat_completion_request_and_parses_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Director of Warehousing at OB Streem"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 850, "completion_tokens": 9, "total_tokens": 859}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = complete_against(&server, Duration::from_secs(5))
        .await
        .expect("completion should succeed");

    assert_eq!(completion.text, "Director of Warehousing at OB Streem");
    assert_eq!(completion.finish_reason, FinishReason::Complete);
    assert_eq!(
        completion.usage,
        Some(Usage {
            input_tokens: 850,
            output_tokens: 9
        })
    );

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 400);
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "Answer only from KNOWLEDGE."},
            {"role": "user", "content": "What is his current role?"}
        ])
    );
}

#[tokio::test]
async fn provider_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let err = complete_against(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProviderError::ApiError {
            status: 401,
            message: "Incorrect API key provided".to_string()
        }
    );
}

#[tokio::test]
async fn too_many_requests_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .mount(&server)
        .await;

    let err = complete_against(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "RateLimited");
    assert!(err.to_string().contains("Rate limit reached"));
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = complete_against(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "MalformedResponse");
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = complete_against(&server, Duration::from_millis(300))
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::Timeout(Duration::from_millis(300)));
}

#[tokio::test]
async fn unreachable_upstream_is_network_error() {
    let provider = OpenAiProvider::new("http://127.0.0.1:1/v1", Duration::from_secs(5)).unwrap();

    let err = provider
        .complete(&credential(), &messages(), &params())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "NetworkError");
}
