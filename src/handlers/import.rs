use axum::{extract::State, response::Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportResponse {
    /// Number of batches created from the uploaded sheet
    pub imported_count: usize,
}

/// Import a price list as product batches
///
/// The body is either an `.xlsx` workbook, whose first worksheet is read, or
/// the sheet exported as tab, semicolon or comma separated text.
#[utoipa::path(
    post,
    path = "/api/v1/import",
    request_body(
        content(
            (Vec<u8> = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            (String = "text/plain")
        ),
        description = "Price list workbook or delimited export"
    ),
    responses(
        (status = 200, description = "Batches imported", body = ApiResponse<ImportResponse>),
        (status = 400, description = "Empty body or unreadable sheet", body = crate::errors::ErrorResponse),
        (status = 413, description = "Body too large")
    ),
    tag = "import"
)]
pub async fn import_batches(State(state): State<AppState>, body: Bytes) -> ApiResult<ImportResponse> {
    let imported_count = state.services.import.import(&body).await?;
    Ok(Json(ApiResponse::success(ImportResponse { imported_count })))
}
