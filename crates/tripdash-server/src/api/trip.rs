use axum::{extract::State, Extension, Json};
use tripdash_core::Trip;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

/// GET /api/v1/trip
pub(super) async fn get_trip(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Trip>> {
    Json(ApiResponse {
        data: Trip::clone(&state.trip),
        meta: ResponseMeta::new(req_id.0),
    })
}
