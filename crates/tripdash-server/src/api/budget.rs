use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tripdash_core::BudgetEstimate;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct BudgetQuery {
    pub destination: String,
    pub budget: Decimal,
    #[serde(default)]
    pub live: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct BudgetData {
    pub currency: String,
    #[serde(flatten)]
    pub estimate: BudgetEstimate,
}

#[derive(Debug, Serialize)]
pub(super) struct DestinationItem {
    pub key: String,
    pub name: String,
    pub description: String,
    pub total: Decimal,
    pub currency: String,
}

/// GET /api/v1/budget?destination=..&budget=..[&live=true]
pub(super) async fn estimate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<BudgetQuery>,
) -> Result<Json<ApiResponse<BudgetData>>, ApiError> {
    let rid = &req_id.0;
    let destination = params.destination.trim();
    if destination.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "destination must not be blank",
        ));
    }
    if params.budget < Decimal::ZERO {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "budget must not be negative",
        ));
    }

    let mut estimate = state.catalog.estimate(destination, params.budget);

    if params.live {
        tokio::time::sleep(state.settings.live_delay).await;
        if !state.catalog.apply_verified(&mut estimate, Utc::now()) {
            tracing::warn!(query = destination, "no verified listing, keeping cached estimate");
        }
    }

    tracing::debug!(
        query = destination,
        matched = %estimate.matched,
        verified = estimate.verified,
        "budget estimated"
    );

    Ok(Json(ApiResponse {
        data: BudgetData {
            currency: state.settings.currency.clone(),
            estimate,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/destinations
pub(super) async fn list_destinations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<DestinationItem>>> {
    let data = state
        .catalog
        .entries()
        .iter()
        .map(|entry| DestinationItem {
            key: entry.key.clone(),
            name: entry.record.name.clone(),
            description: entry.record.description.clone(),
            total: entry.record.total_cost(),
            currency: state.settings.currency.clone(),
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}
