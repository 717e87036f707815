use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;
use auditmon_storage::error::StorageError;
use auditmon_storage::ScannerConfigRow;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// One external image-scanner endpoint configuration.
#[derive(Serialize, ToSchema)]
struct ScannerConfigResponse {
    id: String,
    name: String,
    username: String,
    url: String,
    ssl_verify: bool,
}

impl From<ScannerConfigRow> for ScannerConfigResponse {
    fn from(row: ScannerConfigRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            username: row.username,
            url: row.url,
            ssl_verify: row.ssl_verify,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
struct ScannerConfigBody {
    name: String,
    username: String,
    password: String,
    url: String,
    #[serde(default = "default_ssl_verify")]
    ssl_verify: bool,
}

fn default_ssl_verify() -> bool {
    true
}

/// List configured scanner endpoints.
#[utoipa::path(
    get,
    path = "/api/1/anchore",
    tag = "Scanners",
    responses(
        (status = 200, description = "Configured scanner endpoints", body = Vec<ScannerConfigResponse>),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn list_scanners(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.list_scanner_configs().await {
        Ok(rows) => {
            let items: Vec<ScannerConfigResponse> =
                rows.into_iter().map(ScannerConfigResponse::from).collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list scanner configs");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

/// Create one scanner endpoint configuration.
#[utoipa::path(
    post,
    path = "/api/1/anchore",
    tag = "Scanners",
    request_body = ScannerConfigBody,
    responses(
        (status = 201, description = "Created", body = ScannerConfigResponse),
        (status = 409, description = "Name already exists", body = crate::api::ApiError)
    )
)]
async fn create_scanner(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<ScannerConfigBody>,
) -> impl IntoResponse {
    match state
        .store
        .insert_scanner_config(
            &body.name,
            &body.username,
            &body.password,
            &body.url,
            body.ssl_verify,
        )
        .await
    {
        Ok(row) => (StatusCode::CREATED, Json(ScannerConfigResponse::from(row))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create scanner config");
            error_response(
                StatusCode::CONFLICT,
                &trace_id,
                "Scanner configuration could not be created",
            )
        }
    }
}

/// Fetch one scanner endpoint configuration.
#[utoipa::path(
    get,
    path = "/api/1/anchore/{id}",
    tag = "Scanners",
    params(("id" = String, Path, description = "Scanner config ID")),
    responses(
        (status = 200, description = "Scanner endpoint", body = ScannerConfigResponse),
        (status = 404, description = "No such configuration item", body = crate::api::ApiError)
    )
)]
async fn get_scanner(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_scanner_config(&id).await {
        Ok(Some(row)) => (StatusCode::OK, Json(ScannerConfigResponse::from(row))).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "No such configuration item exists",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch scanner config");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

/// Update one scanner endpoint configuration.
#[utoipa::path(
    put,
    path = "/api/1/anchore/{id}",
    tag = "Scanners",
    params(("id" = String, Path, description = "Scanner config ID")),
    request_body = ScannerConfigBody,
    responses(
        (status = 200, description = "Updated", body = ScannerConfigResponse),
        (status = 404, description = "No such configuration item", body = crate::api::ApiError)
    )
)]
async fn update_scanner(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ScannerConfigBody>,
) -> impl IntoResponse {
    match state
        .store
        .update_scanner_config(
            &id,
            &body.name,
            &body.username,
            &body.password,
            &body.url,
            body.ssl_verify,
        )
        .await
    {
        Ok(row) => (StatusCode::OK, Json(ScannerConfigResponse::from(row))).into_response(),
        Err(e) => {
            if matches!(
                e.downcast_ref::<StorageError>(),
                Some(StorageError::NotFound { .. })
            ) {
                return error_response(
                    StatusCode::NOT_FOUND,
                    &trace_id,
                    "No such configuration item exists",
                );
            }
            tracing::error!(error = %e, "Failed to update scanner config");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
struct DeleteResponse {
    status: String,
}

/// Delete one scanner endpoint configuration.
#[utoipa::path(
    delete,
    path = "/api/1/anchore/{id}",
    tag = "Scanners",
    params(("id" = String, Path, description = "Scanner config ID")),
    responses(
        (status = 202, description = "Deleted", body = DeleteResponse),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn delete_scanner(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_scanner_config(&id).await {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(DeleteResponse {
                status: "deleted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete scanner config");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

pub fn scanner_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_scanners, create_scanner))
        .routes(routes!(get_scanner, update_scanner, delete_scanner))
}
