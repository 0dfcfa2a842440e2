use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::services::group_queries::{GroupItemView, GroupSummary};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct GroupListQuery {
    /// Number of groups to skip
    pub skip: Option<u64>,
    /// Page size, clamped to 1..=200 (default 50)
    #[param(minimum = 1, maximum = 200)]
    pub take: Option<u64>,
}

/// List groups, newest first
#[utoipa::path(
    get,
    path = "/api/v1/groups",
    params(GroupListQuery),
    responses(
        (status = 200, description = "Groups listed", body = ApiResponse<Vec<GroupSummary>>)
    ),
    tag = "groups"
)]
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<GroupListQuery>,
) -> ApiResult<Vec<GroupSummary>> {
    let groups = state
        .services
        .queries
        .list_groups(query.skip, query.take)
        .await?;
    Ok(Json(ApiResponse::success(groups)))
}

/// Items of one group with their batch details
#[utoipa::path(
    get,
    path = "/api/v1/groups/:id/items",
    params(
        ("id" = Uuid, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Group items", body = ApiResponse<Vec<GroupItemView>>),
        (status = 404, description = "Group not found", body = crate::errors::ErrorResponse)
    ),
    tag = "groups"
)]
pub async fn get_group_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<GroupItemView>> {
    let items = state.services.queries.group_items(id).await?;
    Ok(Json(ApiResponse::success(items)))
}
