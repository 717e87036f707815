use crate::api::{envelope_response, error_response, parse_csv, AccountsFilter};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Open finding count and percentage share for one technology.
#[derive(Serialize, ToSchema)]
struct TechCountResponse {
    technology: String,
    count: i64,
    percentage: f64,
}

/// Open finding counts per technology.
#[utoipa::path(
    get,
    path = "/api/1/vulnbytech",
    tag = "Charts",
    params(AccountsFilter),
    responses(
        (status = 200, description = "Counts grouped by technology"),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn vulnerabilities_by_tech(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(filter): Query<AccountsFilter>,
) -> impl IntoResponse {
    let accounts = parse_csv(filter.accounts.as_deref());
    match state
        .store
        .vulnerabilities_by_tech(accounts.as_deref())
        .await
    {
        Ok(counts) => {
            let items: Vec<TechCountResponse> = counts
                .into_iter()
                .map(|c| TechCountResponse {
                    technology: c.technology,
                    count: c.count,
                    percentage: c.percentage,
                })
                .collect();
            envelope_response(items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to count vulnerabilities by technology");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

/// Open finding counts bucketed Low/Medium/High.
#[derive(Serialize, ToSchema)]
struct SeverityBucketsResponse {
    low: i64,
    medium: i64,
    high: i64,
}

/// Open finding counts by severity band.
#[utoipa::path(
    get,
    path = "/api/1/vulnbyseverity",
    tag = "Charts",
    params(AccountsFilter),
    responses(
        (status = 200, description = "Low/medium/high counts"),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn vulnerabilities_by_severity(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(filter): Query<AccountsFilter>,
) -> impl IntoResponse {
    let accounts = parse_csv(filter.accounts.as_deref());
    match state
        .store
        .vulnerabilities_by_severity(accounts.as_deref())
        .await
    {
        Ok(buckets) => envelope_response(vec![SeverityBucketsResponse {
            low: buckets.low,
            medium: buckets.medium,
            high: buckets.high,
        }]),
        Err(e) => {
            tracing::error!(error = %e, "Failed to count vulnerabilities by severity");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct MonthlyParams {
    /// Comma-separated account names.
    #[param(required = false)]
    accounts: Option<String>,
    /// Severity band filter (low / medium / high).
    #[param(required = false)]
    sev: Option<String>,
    /// Comma-separated technology names.
    #[param(required = false)]
    tech: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct MonthCountResponse {
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Count")]
    count: i64,
}

/// Revision counts of finding-bearing items bucketed by month.
#[utoipa::path(
    get,
    path = "/api/1/issuescountbymonth",
    tag = "Charts",
    params(MonthlyParams),
    responses(
        (status = 200, description = "Counts per month"),
        (status = 500, description = "Storage failure", body = crate::api::ApiError)
    )
)]
async fn issues_count_by_month(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<MonthlyParams>,
) -> impl IntoResponse {
    let accounts = parse_csv(params.accounts.as_deref());
    let technologies = parse_csv(params.tech.as_deref());
    match state
        .store
        .issues_count_by_month(
            accounts.as_deref(),
            params.sev.as_deref(),
            technologies.as_deref(),
        )
        .await
    {
        Ok(counts) => {
            let items: Vec<MonthCountResponse> = counts
                .into_iter()
                .map(|c| MonthCountResponse {
                    month: c.month,
                    count: c.count,
                })
                .collect();
            envelope_response(items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to count issues by month");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            )
        }
    }
}

pub fn chart_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(vulnerabilities_by_tech))
        .routes(routes!(vulnerabilities_by_severity))
        .routes(routes!(issues_count_by_month))
}
