#![allow(dead_code)]

use anyhow::Result;
use auditmon_common::id::next_id;
use auditmon_server::app;
use auditmon_server::config::ServerConfig;
use auditmon_server::state::AppState;
use auditmon_storage::{AccountRow, Store};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    auditmon_common::id::init(1, 1);

    let store = Arc::new(Store::new("sqlite::memory:").await?);
    let state = AppState {
        store,
        config: Arc::new(ServerConfig::default()),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext { state, app })
}

pub async fn seed_account(ctx: &TestContext, name: &str, identifier: &str) -> AccountRow {
    ctx.state
        .store
        .insert_account(&AccountRow {
            id: next_id(),
            name: name.to_string(),
            identifier: identifier.to_string(),
            active: true,
            third_party: false,
            notify_emails: vec![],
            ignore_list: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .expect("account should insert")
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = builder.header("Content-Type", "application/json");

    let req_body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let req = builder.body(req_body).expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}

pub fn assert_envelope(json: &Value) {
    assert_eq!(json["page"], 1);
    assert!(json["items"].is_array());
    assert!(json["count"].is_u64() || json["count"].is_i64());
    assert!(json.get("auth").is_some());
}

/// A synthetic GuardDuty port-probe event for the given account
/// identifier, shaped like the EventBridge payload.
pub fn sample_guardduty_event(identifier: &str, severity: i64) -> Value {
    serde_json::json!({
        "account": identifier,
        "region": "us-east-1",
        "detail": {
            "description": "EC2 instance has an unprotected port which is being probed by a known malicious host.",
            "severity": severity,
            "title": "Unprotected port on EC2 instance i-036cb01d26bb09166 is being probed.",
            "type": "Recon:EC2/PortProbeUnprotectedPort",
            "accountId": "726064622671",
            "region": "us-east-1",
            "service": {
                "serviceName": "guardduty",
                "action": {
                    "actionType": "PORT_PROBE",
                    "portProbeAction": {
                        "blocked": false,
                        "portProbeDetails": [
                            {
                                "remoteIpDetails": {
                                    "organization": {
                                        "org": "NexG Co.",
                                        "isp": "NexG Co.",
                                        "asn": 17877,
                                        "asnOrg": "NexG Co., LTD"
                                    },
                                    "ipAddressV4": "221.132.75.236",
                                    "city": {"cityName": "Seoul"},
                                    "geoLocation": {"lat": 37.5111, "lon": 126.9743},
                                    "country": {"countryName": "South Korea"}
                                },
                                "localPortDetails": {"portName": "SSH", "port": 22}
                            },
                            {
                                "remoteIpDetails": {
                                    "organization": {
                                        "org": "CariNet",
                                        "isp": "CariNet",
                                        "asn": 10439,
                                        "asnOrg": "CariNet, Inc."
                                    },
                                    "ipAddressV4": "71.6.167.142",
                                    "city": {"cityName": "San Diego"},
                                    "geoLocation": {"lat": 32.8073, "lon": -117.1324},
                                    "country": {"countryName": "United States"}
                                },
                                "localPortDetails": {"portName": "Unknown", "port": 81}
                            }
                        ]
                    }
                }
            }
        },
        "detail-type": "GuardDuty Finding",
        "source": "aws.guardduty",
        "version": "0",
        "time": "1970-01-01T00:00:00Z",
        "id": "9fd36791-b982-24d8-738c-d8e2c69a48dd",
        "resources": []
    })
}
