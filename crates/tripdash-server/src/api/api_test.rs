use std::sync::atomic::{AtomicBool, Ordering};

use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use futures::future::BoxFuture;
use tower::ServiceExt;
use tripdash_gemini::GeminiError;

const TWO_PLACES: &str =
    "Name: Colosseum\nLocation: 41.8902, 12.4922\n---\nName: Pantheon\nLocation: 41.8986, 12.4769\n---";

/// Hangs forever on the first prompt, then answers with [`TWO_PLACES`].
struct StallsOnce(AtomicBool);

impl TextGenerator for StallsOnce {
    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, GeminiError>> {
        if self.0.swap(true, Ordering::SeqCst) {
            let reply: Result<String, GeminiError> = Ok(TWO_PLACES.to_string());
            Box::pin(async move { reply })
        } else {
            Box::pin(futures::future::pending::<Result<String, GeminiError>>())
        }
    }
}

/// Answers every prompt with the same canned outcome.
struct Canned(Option<&'static str>);

impl TextGenerator for Canned {
    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, GeminiError>> {
        let outcome = match self.0 {
            Some(text) => Ok(text.to_string()),
            None => Err(GeminiError::Api {
                status: 500,
                message: "internal".to_string(),
            }),
        };
        Box::pin(async move { outcome })
    }
}

fn test_state(generator: Option<Arc<dyn TextGenerator>>) -> AppState {
    AppState::new(
        Catalog::embedded().expect("catalog"),
        Trip::embedded().expect("trip"),
        generator,
        ApiSettings {
            place_count: 5,
            maps_api_key: Some("maps-key".to_string()),
            currency: "LKR".to_string(),
            live_delay: Duration::ZERO,
        },
    )
}

fn app_with(generator: Option<Arc<dyn TextGenerator>>) -> Router {
    build_app(test_state(generator), default_message_quota())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, json)
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn json_req(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn create_session(app: &Router) -> String {
    let (status, json) = send(app, json_req("POST", "/api/v1/sessions", &serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().expect("session id").to_string()
}

// ---------------------------------------------------------------------------
// envelope
// ---------------------------------------------------------------------------

#[test]
fn api_error_codes_map_to_status() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("validation_error", StatusCode::BAD_REQUEST),
        ("conflict", StatusCode::CONFLICT),
        ("not_configured", StatusCode::SERVICE_UNAVAILABLE),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("something_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_chat_configuration() {
    let (status, json) = send(&app_with(None), get_req("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["chat"], "not_configured");

    let app = app_with(Some(Arc::new(Canned(Some("hi")))));
    let (_, json) = send(&app, get_req("/api/v1/health")).await;
    assert_eq!(json["data"]["chat"], "configured");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let request = Request::builder()
        .uri("/api/v1/health")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .expect("request");
    let response = app_with(None).oneshot(request).await.expect("response");
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-123")
    );
}

// ---------------------------------------------------------------------------
// budget, destinations, trip, extract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn budget_over_budget_exact_match() {
    let (status, json) = send(
        &app_with(None),
        get_req("/api/v1/budget?destination=Galle%20Face%20Green&budget=1000"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["currency"], "LKR");
    assert_eq!(data["matched"], "exact");
    assert_eq!(data["total_expenses"], "1750");
    assert_eq!(data["remaining"], "-750");
    assert_eq!(data["is_over_budget"], true);
    assert_eq!(data["categories"][0]["category"], "Food");
}

#[tokio::test]
async fn budget_unknown_destination_falls_back() {
    let (status, json) = send(
        &app_with(None),
        get_req("/api/v1/budget?destination=Kandy&budget=5000"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["matched"], "fallback");
    assert_eq!(json["data"]["record"]["name"], "Kandy");
    assert_eq!(json["data"]["total_expenses"], "2700");
}

#[tokio::test]
async fn budget_live_uses_verified_listing() {
    let (status, json) = send(
        &app_with(None),
        get_req("/api/v1/budget?destination=Independence%20Square&budget=5000&live=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["verified"], true);
    assert_eq!(data["record"]["name"], "Independence Square");
    assert_eq!(data["total_expenses"], "4300");
    assert!(data["record"]["last_updated"].is_string());
}

#[tokio::test]
async fn budget_rejects_negative_and_blank() {
    let app = app_with(None);
    let (status, json) = send(&app, get_req("/api/v1/budget?destination=Kandy&budget=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, _) = send(&app, get_req("/api/v1/budget?destination=%20&budget=10")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn destinations_list_catalog_in_order() {
    let (status, json) = send(&app_with(None), get_req("/api/v1/destinations")).await;
    assert_eq!(status, StatusCode::OK);
    let items = json["data"].as_array().expect("array");
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["key"], "Galle Face Green");
    assert_eq!(items[0]["total"], "1750");
    assert_eq!(items[4]["name"], "Traditional Sri Lankan High Tea");
}

#[tokio::test]
async fn trip_returns_dashboard_data() {
    let (status, json) = send(&app_with(None), get_req("/api/v1/trip")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["destination"], "Rome");
    assert_eq!(json["data"]["start_date"], "2021-09-01");
    assert_eq!(json["data"]["todos"][3]["priority"], "high");
}

#[tokio::test]
async fn extract_returns_places_with_map_urls() {
    let body = serde_json::json!({ "text": TWO_PLACES });
    let (status, json) = send(&app_with(None), json_req("POST", "/api/v1/extract", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let places = json["data"].as_array().expect("array");
    assert_eq!(places.len(), 2);
    assert_eq!(places[0]["label"], "Colosseum");
    assert_eq!(places[0]["latitude"], 41.8902);
    assert!(places[0]["map_url"]
        .as_str()
        .expect("map url")
        .contains("key=maps%2Dkey&q=41.8902,12.4922"));
}

#[tokio::test]
async fn extract_garbage_is_empty_not_error() {
    let body = serde_json::json!({ "text": "nothing useful here" });
    let (status, json) = send(&app_with(None), json_req("POST", "/api/v1/extract", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_lifecycle() {
    let app = app_with(Some(Arc::new(Canned(Some(TWO_PLACES)))));
    let id = create_session(&app).await;

    let (status, json) = send(
        &app,
        json_req(
            "POST",
            &format!("/api/v1/sessions/{id}/messages"),
            &serde_json::json!({ "text": "Rome" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["pending"], false);
    assert_eq!(data["turns"].as_array().map(Vec::len), Some(2));
    assert_eq!(data["turns"][0]["role"], "user");
    assert_eq!(data["turns"][1]["role"], "assistant");
    assert_eq!(data["selected"]["turn"], 1);
    assert_eq!(data["selected"]["place"]["label"], "Colosseum");

    let (status, json) = send(
        &app,
        json_req(
            "PUT",
            &format!("/api/v1/sessions/{id}/selection"),
            &serde_json::json!({ "turn": 1, "index": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["place"]["label"], "Pantheon");

    let (_, json) = send(&app, get_req(&format!("/api/v1/sessions/{id}"))).await;
    assert_eq!(json["data"]["selected"]["index"], 1);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/sessions/{id}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, get_req(&format!("/api/v1/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn failed_generation_records_fallback_reply() {
    let app = app_with(Some(Arc::new(Canned(None))));
    let id = create_session(&app).await;

    let (status, json) = send(
        &app,
        json_req(
            "POST",
            &format!("/api/v1/sessions/{id}/messages"),
            &serde_json::json!({ "text": "Rome" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"]["turns"][1]["text"],
        tripdash_explore::FALLBACK_REPLY
    );
    assert!(json["data"]["selected"].is_null());
}

#[tokio::test]
async fn message_without_api_key_is_not_configured() {
    let app = app_with(None);
    let id = create_session(&app).await;

    let (status, json) = send(
        &app,
        json_req(
            "POST",
            &format!("/api/v1/sessions/{id}/messages"),
            &serde_json::json!({ "text": "Rome" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "not_configured");
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let app = app_with(Some(Arc::new(Canned(Some(TWO_PLACES)))));
    let id = create_session(&app).await;

    let (status, _) = send(
        &app,
        json_req(
            "POST",
            &format!("/api/v1/sessions/{id}/messages"),
            &serde_json::json!({ "text": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = send(&app, get_req(&format!("/api/v1/sessions/{id}"))).await;
    assert_eq!(json["data"]["turns"], serde_json::json!([]));
}

#[tokio::test]
async fn selecting_missing_place_is_validation_error() {
    let app = app_with(Some(Arc::new(Canned(Some(TWO_PLACES)))));
    let id = create_session(&app).await;

    let (status, json) = send(
        &app,
        json_req(
            "PUT",
            &format!("/api/v1/sessions/{id}/selection"),
            &serde_json::json!({ "turn": 0, "index": 0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app_with(Some(Arc::new(Canned(Some(TWO_PLACES)))));
    let id = Uuid::new_v4();
    let (status, _) = send(
        &app,
        json_req(
            "POST",
            &format!("/api/v1/sessions/{id}/messages"),
            &serde_json::json!({ "text": "Rome" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_quota_is_per_session() {
    let state = test_state(Some(Arc::new(Canned(Some(TWO_PLACES)))));
    let app = build_app(state, MessageQuota::new(1, Duration::from_secs(60)));
    let first = create_session(&app).await;
    let second = create_session(&app).await;
    let body = serde_json::json!({ "text": "Rome" });
    let post_to = |id: &str| json_req("POST", &format!("/api/v1/sessions/{id}/messages"), &body);

    let (status, _) = send(&app, post_to(&first)).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.clone().oneshot(post_to(&first)).await.expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("retry-after header");
    assert!((1..=60).contains(&retry_after), "retry-after {retry_after}");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(json["error"]["code"], "rate_limited");

    let (status, _) = send(&app, post_to(&second)).await;
    assert_eq!(status, StatusCode::OK);

    // Reads are not metered.
    let (status, _) = send(&app, get_req(&format!("/api/v1/sessions/{first}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn dropped_request_does_not_leave_session_pending() {
    let app = app_with(Some(Arc::new(StallsOnce(AtomicBool::new(false)))));
    let id = create_session(&app).await;
    let uri = format!("/api/v1/sessions/{id}/messages");
    let body = serde_json::json!({ "text": "Rome" });

    let cut_off = tokio::time::timeout(
        Duration::from_millis(50),
        app.clone().oneshot(json_req("POST", &uri, &body)),
    )
    .await;
    assert!(cut_off.is_err(), "stalled request should not complete");

    let (status, json) = send(&app, get_req(&format!("/api/v1/sessions/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pending"], false);
    assert_eq!(json["data"]["turns"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        json["data"]["turns"][1]["text"],
        tripdash_explore::FALLBACK_REPLY
    );

    let (status, json) = send(&app, json_req("POST", &uri, &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["turns"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["data"]["selected"]["place"]["label"], "Colosseum");
}
