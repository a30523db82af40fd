//! Request tagging and the per-session message quota.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request id we pass through unchanged.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id stored as a request extension for handlers and error envelopes.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The caller's `x-request-id` (trimmed) when it is non-blank and not
/// oversized, otherwise a fresh `UUIDv4`.
fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Tags every request with a [`RequestId`] and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = resolve_request_id(req.headers());
    let echoed = HeaderValue::from_str(&id).ok();
    req.extensions_mut().insert(RequestId(id));

    let mut res = next.run(req).await;
    if let Some(value) = echoed {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    used: u32,
}

/// Fixed-window cap on message posts, counted separately for each chat
/// session. Every counted post is one Gemini call.
#[derive(Debug, Clone)]
pub struct MessageQuota {
    per_window: u32,
    window: Duration,
    sessions: Arc<Mutex<HashMap<Uuid, Window>>>,
}

impl MessageQuota {
    #[must_use]
    pub fn new(per_window: u32, window: Duration) -> Self {
        Self {
            per_window,
            window,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one message for `session` at `now`.
    ///
    /// When the session's window is spent, returns the time left until it
    /// reopens. Expired windows are dropped on every call so deleted sessions
    /// do not accumulate.
    async fn take(&self, session: Uuid, now: Instant) -> Result<(), Duration> {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, w| now.saturating_duration_since(w.opened_at) < self.window);

        let window = sessions.entry(session).or_insert(Window {
            opened_at: now,
            used: 0,
        });
        if window.used >= self.per_window {
            let elapsed = now.saturating_duration_since(window.opened_at);
            return Err(self.window.saturating_sub(elapsed));
        }
        window.used += 1;
        Ok(())
    }
}

/// Rejects a message post with 429 and `Retry-After` once its session has
/// spent the quota for the current window.
pub async fn enforce_message_quota(
    State(quota): State<MessageQuota>,
    Path(session): Path<Uuid>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(retry_in) = quota.take(session, Instant::now()).await {
        let retry_secs = retry_in.as_secs().max(1);
        tracing::warn!(session = %session, retry_secs, "message quota spent");
        let mut res = ApiError::new(
            req_id.0,
            "rate_limited",
            format!("message limit reached for session {session}; retry in {retry_secs}s"),
        )
        .into_response();
        res.headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_secs));
        return res;
    }

    next.run(req).await
}
