use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Product Grouping API",
        version = "0.1.0",
        description = r#"
# Product Grouping API

Imports product batches from price lists and packs their stock into groups
whose total value never exceeds 200.

## Grouping

Groups are filled greedily: the most expensive batch that still fits is taken
first, as many units as fit, then the next one. A run repeats this until the
remaining stock is exhausted or nothing fits any more. Runs happen on a fixed
interval and can be triggered manually through `POST /admin/grouping/run`.

## Error Handling

Errors share one response format:

```json
{
  "error": "Conflict",
  "message": "Conflict: A grouping run is already in progress",
  "request_id": "8f14e45f-ceea-467f-a0e6-6a7b1b2b8e9c",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "import", description = "Price list import"),
        (name = "groups", description = "Created groups and their items"),
        (name = "admin", description = "Manual runs and batch inspection"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::import::import_batches,
        crate::handlers::groups::list_groups,
        crate::handlers::groups::get_group_items,
        crate::handlers::admin::run_grouping,
        crate::handlers::admin::list_batches,
        crate::handlers::health::api_status,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::handlers::import::ImportResponse,
            crate::handlers::admin::RunResponse,
            crate::handlers::health::StatusResponse,
            crate::handlers::health::HealthResponse,
            crate::services::group_queries::GroupSummary,
            crate::services::group_queries::GroupItemView,
            crate::services::group_queries::BatchView,
            crate::services::grouping::RunSummary,
            crate::entities::BatchStatus,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Pretty-printed JSON of the v1 document, as committed under `openapi/`.
pub fn render_json() -> serde_json::Result<String> {
    ApiDocV1::openapi().to_pretty_json()
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
