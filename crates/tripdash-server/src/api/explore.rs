use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use tripdash_explore::extract_locations;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, PlaceItem, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ExtractRequest {
    pub text: String,
}

/// POST /api/v1/extract: parse places out of reply text without calling
/// the model. Unparseable input yields an empty list, never an error.
pub(super) async fn extract(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ExtractRequest>,
) -> Json<ApiResponse<Vec<PlaceItem>>> {
    let places = extract_locations(&body.text);
    Json(ApiResponse {
        data: PlaceItem::list(&places, state.settings.maps_api_key.as_deref()),
        meta: ResponseMeta::new(req_id.0),
    })
}
