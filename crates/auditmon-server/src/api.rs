pub mod charts;
pub mod guardduty;
pub mod poam;
pub mod scanners;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Authentication block carried by the legacy envelope. Authentication
/// itself is handled by an external gateway; the block is kept for
/// dashboard compatibility.
#[derive(Serialize, ToSchema)]
pub struct AuthInfo {
    pub authenticated: bool,
    pub user: Option<String>,
}

impl Default for AuthInfo {
    fn default() -> Self {
        Self {
            authenticated: true,
            user: None,
        }
    }
}

/// Legacy response envelope shared by the chart/report endpoints:
/// `{page, total, count, items, auth}`.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub page: u64,
    pub total: u64,
    pub count: u64,
    pub auth: AuthInfo,
    pub items: Vec<T>,
}

pub fn envelope_response<T: Serialize>(items: Vec<T>) -> Response {
    let count = items.len() as u64;
    (
        StatusCode::OK,
        Json(Envelope {
            page: 1,
            total: count,
            count,
            auth: AuthInfo::default(),
            items,
        }),
    )
        .into_response()
}

/// JSON error payload for non-envelope failures.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub trace_id: String,
}

pub fn error_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiError {
            error: msg.to_string(),
            trace_id: trace_id.to_string(),
        }),
    )
        .into_response()
}

/// Comma-separated filter value (`accounts`, `tech`) into a name list.
pub fn parse_csv(raw: Option<&str>) -> Option<Vec<String>> {
    let names: Vec<String> = raw?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Shared query parameter for the account filter.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountsFilter {
    /// Comma-separated account names.
    #[param(required = false)]
    pub accounts: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    accounts: u64,
    items: u64,
    storage_status: String,
}

/// Service health: version, uptime, and coarse row counts.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse),
        (status = 500, description = "Storage failure", body = ApiError)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let (accounts, items) = match (
        state.store.count_accounts().await,
        state.store.count_items().await,
    ) {
        (Ok(a), Ok(i)) => (a, i),
        _ => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            );
        }
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            accounts,
            items,
            storage_status: "ok".to_string(),
        }),
    )
        .into_response()
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(charts::chart_routes())
        .merge(poam::poam_routes())
        .merge(guardduty::guardduty_routes())
        .merge(scanners::scanner_routes())
        .merge(crate::ticket::ticket_routes())
}
