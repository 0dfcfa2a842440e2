use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::group_queries::BatchView;
use crate::services::grouping::RunSummary;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    pub created_groups: usize,
    pub batches_exhausted: usize,
    pub unallocatable_batches: usize,
    pub cancelled: bool,
}

impl From<RunSummary> for RunResponse {
    fn from(summary: RunSummary) -> Self {
        Self {
            created_groups: summary.groups_created,
            batches_exhausted: summary.batches_exhausted,
            unallocatable_batches: summary.unallocatable_batches,
            cancelled: summary.cancelled,
        }
    }
}

/// Run grouping now
#[utoipa::path(
    post,
    path = "/api/v1/admin/grouping/run",
    responses(
        (status = 200, description = "Run finished", body = ApiResponse<RunResponse>),
        (status = 409, description = "Another run is in progress or stock changed underneath", body = crate::errors::ErrorResponse),
        (status = 500, description = "Persistence failure", body = crate::errors::ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn run_grouping(State(state): State<AppState>) -> ApiResult<RunResponse> {
    let summary = state
        .services
        .grouping
        .run_allocation(&state.shutdown)
        .await?;
    Ok(Json(ApiResponse::success(summary.into())))
}

/// Every batch with its stock and status
#[utoipa::path(
    get,
    path = "/api/v1/admin/batches",
    responses(
        (status = 200, description = "Batches listed", body = ApiResponse<Vec<BatchView>>)
    ),
    tag = "admin"
)]
pub async fn list_batches(State(state): State<AppState>) -> ApiResult<Vec<BatchView>> {
    let batches = state.services.queries.list_batches().await?;
    Ok(Json(ApiResponse::success(batches)))
}
