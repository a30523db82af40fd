//! Chat session endpoints.
//!
//! Sessions live in memory for the life of the process. The per-session lock
//! is released while the model call runs, so reads of a session stay
//! responsive and a second post to the same session sees `conflict`. If the
//! request is dropped mid-call, [`InFlight`] closes the submission with the
//! fallback reply so the session does not stay pending.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tripdash_core::{ChatTurn, Role};
use tripdash_explore::{ChatSession, SessionError};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, PlaceItem, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SelectRequest {
    pub turn: usize,
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct TurnView {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub locations: Vec<PlaceItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SelectedView {
    pub turn: usize,
    pub index: usize,
    pub place: PlaceItem,
}

#[derive(Debug, Serialize)]
pub(super) struct SessionView {
    pub id: Uuid,
    pub pending: bool,
    pub selected: Option<SelectedView>,
    pub turns: Vec<TurnView>,
}

impl TurnView {
    fn new(turn: &ChatTurn, maps_api_key: Option<&str>) -> Self {
        Self {
            role: turn.role,
            text: turn.text.clone(),
            created_at: turn.created_at,
            locations: PlaceItem::list(&turn.locations, maps_api_key),
        }
    }
}

impl SessionView {
    fn new(id: Uuid, session: &ChatSession, maps_api_key: Option<&str>) -> Self {
        let selected = session.selected().and_then(|sel| {
            session.selected_location().map(|entry| SelectedView {
                turn: sel.turn,
                index: sel.index,
                place: PlaceItem::new(entry, sel.index, maps_api_key),
            })
        });
        Self {
            id,
            pending: session.is_pending(),
            selected,
            turns: session
                .turns()
                .iter()
                .map(|t| TurnView::new(t, maps_api_key))
                .collect(),
        }
    }
}

fn map_session_error(request_id: &str, error: &SessionError) -> ApiError {
    let code = match error {
        SessionError::Busy | SessionError::NotPending => "conflict",
        SessionError::NoSuchTurn(_) | SessionError::NoSuchLocation { .. } => "validation_error",
    };
    ApiError::new(request_id, code, error.to_string())
}

/// Guards a submission between `begin` and `finish`.
///
/// Dropped while still armed, it abandons the submission on the session.
struct InFlight {
    id: Uuid,
    session: Option<Arc<Mutex<ChatSession>>>,
}

impl InFlight {
    fn new(id: Uuid, session: Arc<Mutex<ChatSession>>) -> Self {
        Self {
            id,
            session: Some(session),
        }
    }

    fn disarm(&mut self) {
        self.session = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        tracing::warn!(session = %self.id, "request dropped while awaiting the model");

        if let Ok(mut guard) = session.try_lock() {
            let _ = guard.abandon();
            return;
        }
        // Someone is reading the session; close it once they let go.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = session.lock().await.abandon();
            });
        }
    }
}

async fn find_session(
    state: &AppState,
    id: Uuid,
    request_id: &str,
) -> Result<Arc<Mutex<ChatSession>>, ApiError> {
    state
        .sessions
        .lock()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::new(request_id, "not_found", format!("session {id} not found")))
}

/// POST /api/v1/sessions
pub(super) async fn create_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<ApiResponse<SessionView>>) {
    let id = Uuid::new_v4();
    let session = ChatSession::new(state.settings.place_count);
    let view = SessionView::new(id, &session, state.settings.maps_api_key.as_deref());
    state
        .sessions
        .lock()
        .await
        .insert(id, Arc::new(Mutex::new(session)));
    tracing::info!(session = %id, "chat session created");

    (
        StatusCode::CREATED,
        Json(ApiResponse {
            data: view,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

/// GET /api/v1/sessions/:id
pub(super) async fn get_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let session = find_session(&state, id, &req_id.0).await?;
    let view = SessionView::new(
        id,
        &*session.lock().await,
        state.settings.maps_api_key.as_deref(),
    );
    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/sessions/:id
pub(super) async fn delete_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if state.sessions.lock().await.remove(&id).is_none() {
        return Err(ApiError::new(
            &req_id.0,
            "not_found",
            format!("session {id} not found"),
        ));
    }
    tracing::info!(session = %id, "chat session deleted");
    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/sessions/:id/messages: submit user input and wait for the
/// assistant reply. A failed model call still returns 200 with the fallback
/// reply recorded as the assistant turn.
pub(super) async fn post_message(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let rid = &req_id.0;
    let Some(generator) = state.generator.clone() else {
        return Err(ApiError::new(
            rid,
            "not_configured",
            "chat is unavailable: GEMINI_API_KEY is not set",
        ));
    };
    let session = find_session(&state, id, rid).await?;

    let prompt = session
        .lock()
        .await
        .begin(&body.text)
        .map_err(|e| map_session_error(rid, &e))?;
    let Some(prompt) = prompt else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "message text must not be blank",
        ));
    };

    let mut in_flight = InFlight::new(id, Arc::clone(&session));
    let outcome = generator.generate(&prompt).await;

    let mut guard = session.lock().await;
    in_flight.disarm();
    guard
        .finish(outcome)
        .map_err(|e| map_session_error(rid, &e))?;
    let view = SessionView::new(id, &guard, state.settings.maps_api_key.as_deref());
    drop(guard);

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/sessions/:id/selection
pub(super) async fn select_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<ApiResponse<SelectedView>>, ApiError> {
    let rid = &req_id.0;
    let session = find_session(&state, id, rid).await?;
    let mut guard = session.lock().await;
    let entry = guard
        .select(body.turn, body.index)
        .map_err(|e| map_session_error(rid, &e))?;

    let view = SelectedView {
        turn: body.turn,
        index: body.index,
        place: PlaceItem::new(entry, body.index, state.settings.maps_api_key.as_deref()),
    };
    drop(guard);

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}
