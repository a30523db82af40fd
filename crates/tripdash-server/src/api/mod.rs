mod budget;
mod explore;
mod sessions;
mod trip;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tripdash_core::{embed_url, AppConfig, Catalog, LocationEntry, Trip};
use tripdash_explore::ChatSession;
use tripdash_gemini::TextGenerator;
use uuid::Uuid;

use crate::middleware::{
    enforce_message_quota, request_id, MessageQuota, RequestId, REQUEST_ID_HEADER,
};

pub type SessionStore = Arc<Mutex<HashMap<Uuid, Arc<Mutex<ChatSession>>>>>;

/// Settings handlers need from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub place_count: usize,
    pub maps_api_key: Option<String>,
    pub currency: String,
    pub live_delay: Duration,
}

impl ApiSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            place_count: config.place_count,
            maps_api_key: config.maps_api_key.clone(),
            currency: config.currency.clone(),
            live_delay: Duration::from_millis(config.live_delay_ms),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub trip: Arc<Trip>,
    /// `None` when no API key is configured; chat endpoints answer 503.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub sessions: SessionStore,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    #[must_use]
    pub fn new(
        catalog: Catalog,
        trip: Trip,
        generator: Option<Arc<dyn TextGenerator>>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            trip: Arc::new(trip),
            generator,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            settings: Arc::new(settings),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    chat: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "not_configured" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// A place as returned to API clients: display label and map URL resolved.
#[derive(Debug, Serialize)]
pub(super) struct PlaceItem {
    pub name: Option<String>,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub map_url: Option<String>,
}

impl PlaceItem {
    pub(super) fn new(entry: &LocationEntry, index: usize, maps_api_key: Option<&str>) -> Self {
        Self {
            name: entry.name().map(str::to_string),
            label: entry.label(index),
            latitude: entry.latitude(),
            longitude: entry.longitude(),
            map_url: embed_url(maps_api_key, entry),
        }
    }

    pub(super) fn list(entries: &[LocationEntry], maps_api_key: Option<&str>) -> Vec<Self> {
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| Self::new(e, i, maps_api_key))
            .collect()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Routes that spend external API quota.
fn metered_router(quota: MessageQuota) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/sessions/{id}/messages",
            post(sessions::post_message),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            quota,
            enforce_message_quota,
        ))
}

pub fn build_app(state: AppState, quota: MessageQuota) -> Router {
    let routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/extract", post(explore::extract))
        .route("/api/v1/budget", get(budget::estimate))
        .route("/api/v1/destinations", get(budget::list_destinations))
        .route("/api/v1/trip", get(trip::get_trip))
        .route("/api/v1/sessions", post(sessions::create_session))
        .route(
            "/api/v1/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route(
            "/api/v1/sessions/{id}/selection",
            put(sessions::select_location),
        );

    Router::new()
        .merge(routes)
        .merge(metered_router(quota))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let chat = if state.generator.is_some() {
        "configured"
    } else {
        "not_configured"
    };
    Json(ApiResponse {
        data: HealthData { status: "ok", chat },
        meta: ResponseMeta::new(req_id.0),
    })
}

/// Ten message posts per session per minute.
pub fn default_message_quota() -> MessageQuota {
    MessageQuota::new(10, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
