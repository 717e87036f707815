use crate::api::{envelope_response, error_response, parse_csv, AccountsFilter};
use crate::logging::TraceId;
use crate::state::AppState;
use auditmon_storage::error::StorageError;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Port-probe geo points for the world map chart.
#[utoipa::path(
    get,
    path = "/api/1/worldmapguarddutydata",
    tag = "GuardDuty",
    params(AccountsFilter),
    responses(
        (status = 200, description = "Probe locations grouped by coordinates"),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn world_map_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(filter): Query<AccountsFilter>,
) -> impl IntoResponse {
    let accounts = parse_csv(filter.accounts.as_deref());
    match state.store.guardduty_map_points(accounts.as_deref()).await {
        Ok(points) => envelope_response(points),
        Err(e) => {
            tracing::error!(error = %e, "Failed to aggregate GuardDuty map points");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

/// Top 10 countries by probe event count.
#[utoipa::path(
    get,
    path = "/api/1/top10countryguarddutydata",
    tag = "GuardDuty",
    params(AccountsFilter),
    responses(
        (status = 200, description = "Probe counts per country"),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn top_countries(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(filter): Query<AccountsFilter>,
) -> impl IntoResponse {
    let accounts = parse_csv(filter.accounts.as_deref());
    match state
        .store
        .guardduty_top_countries(accounts.as_deref(), 10)
        .await
    {
        Ok(counts) => envelope_response(counts),
        Err(e) => {
            tracing::error!(error = %e, "Failed to aggregate GuardDuty countries");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
struct IngestResponse {
    id: String,
    config: serde_json::Value,
}

/// Ingest one pushed GuardDuty event.
///
/// Stores the item and revision through the diff policy, records the
/// scored finding, and keeps the raw payload for drill-down. Unknown
/// accounts are rejected with 404.
#[utoipa::path(
    post,
    path = "/api/1/gde",
    tag = "GuardDuty",
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Event stored", body = IngestResponse),
        (status = 404, description = "Unknown account", body = crate::api::ApiError),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn ingest_event(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(event): Json<serde_json::Value>,
) -> impl IntoResponse {
    match state.store.ingest_guardduty_event(&event).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(IngestResponse {
                id: outcome.event_id,
                config: event,
            }),
        )
            .into_response(),
        Err(e) => {
            match e.downcast_ref::<StorageError>() {
                Some(StorageError::NotFound { id, .. }) => {
                    return error_response(
                        StatusCode::NOT_FOUND,
                        &trace_id,
                        &format!("Account with identifier [{id}] not found"),
                    );
                }
                Some(StorageError::Other(msg)) => {
                    return error_response(StatusCode::BAD_REQUEST, &trace_id, msg);
                }
                _ => {}
            }
            tracing::error!(error = %e, "Failed to ingest GuardDuty event");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

pub fn guardduty_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(world_map_data))
        .routes(routes!(top_countries))
        .routes(routes!(ingest_event))
}
