//! Integration tests for `GeminiClient` using wiremock HTTP mocks.

use std::time::Duration;

use tripdash_gemini::{GeminiClient, GeminiError, TextGenerator};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn test_client(base_url: &str) -> GeminiClient {
    GeminiClient::with_base_url("test-key", "gemini-1.5-flash", 5, base_url)
        .expect("client construction should not fail")
}

fn reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn generate_content_sends_key_and_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Rome" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Name: Colosseum")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let text = client.generate_content("Rome").await.expect("should succeed");
    assert_eq!(text, "Name: Colosseum");
}

#[tokio::test]
async fn generate_content_joins_multiple_parts() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": "Name: A\n" }, { "text": "Location: 1, 2" }] }
        }]
    });
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let text = test_client(&server.uri())
        .generate_content("x")
        .await
        .unwrap();
    assert_eq!(text, "Name: A\nLocation: 1, 2");
}

#[tokio::test]
async fn api_error_surfaces_status_and_message() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" }
    });
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_json(&body))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_content("x")
        .await
        .unwrap_err();
    match err {
        GeminiError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_with_plain_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_content("x")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, GeminiError::Api { status: 503, message } if message == "overloaded"),
        "{err:?}"
    );
}

#[tokio::test]
async fn blocked_prompt_is_reported() {
    let server = MockServer::start().await;

    let body = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_content("x")
        .await
        .unwrap_err();
    assert!(matches!(&err, GeminiError::Blocked(r) if r == "SAFETY"), "{err:?}");
}

#[tokio::test]
async fn candidate_without_text_is_empty_response() {
    let server = MockServer::start().await;

    let body = serde_json::json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] });
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_content("x")
        .await
        .unwrap_err();
    assert!(matches!(err, GeminiError::EmptyResponse), "{err:?}");
}

#[tokio::test]
async fn malformed_success_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .generate_content("x")
        .await
        .unwrap_err();
    assert!(matches!(err, GeminiError::Deserialize { .. }), "{err:?}");
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = GeminiClient::with_base_url("test-key", "gemini-1.5-flash", 1, &server.uri())
        .expect("client construction should not fail");
    let err = client.generate_content("x").await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn text_generator_delegates_to_client() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("hello")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let generator: &dyn TextGenerator = &client;
    assert_eq!(generator.generate("hi").await.unwrap(), "hello");
}
