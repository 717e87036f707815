use crate::api::{envelope_response, error_response, parse_csv};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

const MAX_PAGE_LIMIT: u64 = 1000;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct PoamParams {
    /// Comma-separated account names.
    #[param(required = false)]
    accounts: Option<String>,
    /// Page size (default 10).
    #[param(required = false)]
    limit: Option<u64>,
    /// Offset (default 0).
    #[param(required = false)]
    offset: Option<u64>,
}

/// One open finding as a POA&M row.
#[derive(Serialize, ToSchema)]
struct PoamItemResponse {
    poam_id: String,
    control: String,
    weakness_name: String,
    weakness_description: String,
    score: i32,
    poam_comments: Option<String>,
    create_date: String,
}

/// Open findings rendered as POA&M rows, worst first.
#[utoipa::path(
    get,
    path = "/api/1/poamitems",
    tag = "Reports",
    params(PoamParams),
    responses(
        (status = 200, description = "POA&M rows"),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn poam_items(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<PoamParams>,
) -> impl IntoResponse {
    let accounts = parse_csv(params.accounts.as_deref());
    let limit = params.limit.unwrap_or(10).min(MAX_PAGE_LIMIT) as usize;
    let offset = params.offset.unwrap_or(0) as usize;

    match state
        .store
        .poam_items(accounts.as_deref(), limit, offset)
        .await
    {
        Ok(rows) => {
            let items: Vec<PoamItemResponse> = rows
                .into_iter()
                .map(|r| PoamItemResponse {
                    poam_id: r.poam_id,
                    control: r.control,
                    weakness_name: r.weakness_name,
                    weakness_description: r.weakness_description,
                    score: r.score,
                    poam_comments: r.poam_comments,
                    create_date: r.create_date,
                })
                .collect();
            envelope_response(items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list POA&M items");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

pub fn poam_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(poam_items))
}
