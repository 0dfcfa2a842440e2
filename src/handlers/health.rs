use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub git: String,
    pub build_time: String,
    pub environment: String,
    pub grouping_enabled: bool,
    pub grouping_running: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: String,
}

/// Build and runtime information
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Service status", body = ApiResponse<StatusResponse>)
    ),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    Ok(Json(ApiResponse::success(StatusResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        environment: state.config.environment.clone(),
        grouping_enabled: state.config.grouping_enabled,
        grouping_running: state.services.grouping.is_running(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })))
}

/// Database connectivity check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Health report", body = ApiResponse<HealthResponse>)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            "unhealthy"
        }
    };

    Ok(Json(ApiResponse::success(HealthResponse {
        status: database.to_string(),
        database: database.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })))
}
