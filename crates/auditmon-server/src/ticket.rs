//! ServiceNow incident bridge.
//!
//! One finding's fields are pushed synchronously to the incident API
//! with basic auth. HTTP 201 maps to a success message carrying the
//! remote ticket number; anything else maps to a generic failure.
//! There is no retry and no idempotency key: re-invoking creates a
//! duplicate remote ticket.

use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;
use auditmon_storage::TicketSource;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("incident API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("incident API answered HTTP {0}")]
    Status(u16),

    #[error("incident API answer carried no ticket number")]
    MissingNumber,
}

#[derive(Serialize)]
struct IncidentPayload {
    caused_by: String,
    short_description: String,
    impact: i32,
    description: String,
}

pub struct ServiceNowClient {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
}

impl ServiceNowClient {
    pub fn new(url: &str, username: &str, password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Open one incident; returns the remote ticket number.
    pub async fn report_incident(&self, source: &TicketSource) -> Result<String, TicketError> {
        let short_description = format!(
            "{},{},{}",
            source.notes.as_deref().unwrap_or(""),
            source.region,
            source.name
        );
        let payload = IncidentPayload {
            caused_by: source.technology.clone(),
            short_description,
            impact: source.score,
            description: source.config.clone().unwrap_or_default(),
        };

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&payload)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(TicketError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response.json().await?;
        body.pointer("/result/number")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or(TicketError::MissingNumber)
    }
}

/// Push one item's current finding to the incident system.
#[utoipa::path(
    post,
    path = "/servicenow/report/item/{item_id}",
    tag = "Ticketing",
    params(("item_id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Human-readable outcome message"),
        (status = 404, description = "Item or finding not found", body = crate::api::ApiError)
    )
)]
async fn report_item(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> impl IntoResponse {
    let source = match state.store.ticket_source(&item_id).await {
        Ok(Some(source)) => source,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                &format!("Item '{item_id}' has no finding to report"),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load ticket source");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "Database error",
            );
        }
    };

    let sn = &state.config.servicenow;
    let client = ServiceNowClient::new(&sn.url, &sn.username, &sn.password);
    match client.report_incident(&source).await {
        Ok(number) => {
            (StatusCode::OK, format!("Incident {number} opened, successfully.")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, item_id = %item_id, "Incident creation failed");
            (
                StatusCode::OK,
                "An error occurred while opening an incident. Please get in touch with your system administrator."
                    .to_string(),
            )
                .into_response()
        }
    }
}

pub fn ticket_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(report_item))
}
