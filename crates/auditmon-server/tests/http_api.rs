mod common;

use axum::http::StatusCode;
use common::{
    assert_envelope, build_test_context, request_json, sample_guardduty_event, seed_account,
};

#[tokio::test]
async fn test_health_reports_counts() {
    let ctx = build_test_context().await.unwrap();
    let (status, body) = request_json(&ctx.app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accounts"], 0);
    assert_eq!(body["items"], 0);
    assert_eq!(body["storage_status"], "ok");
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let ctx = build_test_context().await.unwrap();
    let (status, body) = request_json(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/1/gde").is_some());
    assert!(body["paths"].get("/api/1/vulnbyseverity").is_some());
}

#[tokio::test]
async fn test_guardduty_ingest_end_to_end() {
    let ctx = build_test_context().await.unwrap();
    seed_account(&ctx, "TEST", "123").await;

    let store = &ctx.state.store;
    assert_eq!(store.count_items().await.unwrap(), 0);
    assert_eq!(store.count_revisions().await.unwrap(), 0);
    assert_eq!(store.count_item_audits().await.unwrap(), 0);
    assert_eq!(store.count_auditor_settings().await.unwrap(), 0);
    assert_eq!(store.count_guardduty_events().await.unwrap(), 0);

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/1/gde",
        Some(sample_guardduty_event("123", 2)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());
    assert_eq!(store.count_items().await.unwrap(), 1);
    assert_eq!(store.count_revisions().await.unwrap(), 1);
    assert_eq!(store.count_item_audits().await.unwrap(), 1);
    assert_eq!(store.count_auditor_settings().await.unwrap(), 1);
    assert_eq!(store.count_guardduty_events().await.unwrap(), 1);

    // The finding carries the detail's severity and title.
    let (_, severity) = request_json(&ctx.app, "GET", "/api/1/vulnbyseverity", None).await;
    assert_envelope(&severity);
    assert_eq!(severity["items"][0]["low"], 1);
    assert_eq!(severity["items"][0]["medium"], 0);
    assert_eq!(severity["items"][0]["high"], 0);
}

#[tokio::test]
async fn test_guardduty_ingest_unknown_account_is_404() {
    let ctx = build_test_context().await.unwrap();
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/api/1/gde",
        Some(sample_guardduty_event("999", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_world_map_and_top_countries_after_ingest() {
    let ctx = build_test_context().await.unwrap();
    seed_account(&ctx, "TEST", "123").await;
    request_json(
        &ctx.app,
        "POST",
        "/api/1/gde",
        Some(sample_guardduty_event("123", 2)),
    )
    .await;

    let (status, map) = request_json(&ctx.app, "GET", "/api/1/worldmapguarddutydata", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&map);
    assert_eq!(map["items"].as_array().unwrap().len(), 2);

    let (status, countries) =
        request_json(&ctx.app, "GET", "/api/1/top10countryguarddutydata", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = countries["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["countryName"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"South Korea"));
    assert!(names.contains(&"United States"));
}

#[tokio::test]
async fn test_accounts_filter_excludes_other_accounts() {
    let ctx = build_test_context().await.unwrap();
    seed_account(&ctx, "TEST", "123").await;
    request_json(
        &ctx.app,
        "POST",
        "/api/1/gde",
        Some(sample_guardduty_event("123", 9)),
    )
    .await;

    let (_, all) = request_json(&ctx.app, "GET", "/api/1/vulnbytech", None).await;
    assert_eq!(all["items"].as_array().unwrap().len(), 1);
    assert_eq!(all["items"][0]["technology"], "guardduty");
    assert_eq!(all["items"][0]["percentage"], 100.0);

    let (_, filtered) = request_json(
        &ctx.app,
        "GET",
        "/api/1/vulnbytech?accounts=some-other-account",
        None,
    )
    .await;
    assert!(filtered["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_poam_items_after_ingest() {
    let ctx = build_test_context().await.unwrap();
    seed_account(&ctx, "TEST", "123").await;
    request_json(
        &ctx.app,
        "POST",
        "/api/1/gde",
        Some(sample_guardduty_event("123", 8)),
    )
    .await;

    let (status, body) = request_json(&ctx.app, "GET", "/api/1/poamitems", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_envelope(&body);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0]["poam_id"]
        .as_str()
        .unwrap()
        .starts_with("sa_poam-"));
    assert_eq!(items[0]["control"], "guardduty");
    assert_eq!(items[0]["score"], 8);
}

#[tokio::test]
async fn test_issues_count_by_month_after_ingest() {
    let ctx = build_test_context().await.unwrap();
    seed_account(&ctx, "TEST", "123").await;
    request_json(
        &ctx.app,
        "POST",
        "/api/1/gde",
        Some(sample_guardduty_event("123", 2)),
    )
    .await;

    let (status, body) = request_json(&ctx.app, "GET", "/api/1/issuescountbymonth", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["Count"], 1);
    assert!(items[0]["Month"].is_string());

    // Severity filter uses the canonical banding: a severity-2 finding
    // is Low, so the medium bucket is empty.
    let (_, medium) = request_json(
        &ctx.app,
        "GET",
        "/api/1/issuescountbymonth?sev=medium",
        None,
    )
    .await;
    assert!(medium["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_scanner_config_crud_over_http() {
    let ctx = build_test_context().await.unwrap();

    let (status, created) = request_json(
        &ctx.app,
        "POST",
        "/api/1/anchore",
        Some(serde_json::json!({
            "name": "primary",
            "username": "svc",
            "password": "secret",
            "url": "https://scanner.example",
            "ssl_verify": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    // The password never comes back.
    assert!(created.get("password").is_none());

    let (status, listed) = request_json(&ctx.app, "GET", "/api/1/anchore", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, fetched) =
        request_json(&ctx.app, "GET", &format!("/api/1/anchore/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "primary");

    let (status, updated) = request_json(
        &ctx.app,
        "PUT",
        &format!("/api/1/anchore/{id}"),
        Some(serde_json::json!({
            "name": "primary",
            "username": "svc",
            "password": "rotated",
            "url": "https://scanner.example",
            "ssl_verify": false
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["ssl_verify"], false);

    let (status, _) =
        request_json(&ctx.app, "DELETE", &format!("/api/1/anchore/{id}"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = request_json(&ctx.app, "GET", &format!("/api/1/anchore/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_scanner_update_is_404() {
    let ctx = build_test_context().await.unwrap();
    let (status, _) = request_json(
        &ctx.app,
        "PUT",
        "/api/1/anchore/does-not-exist",
        Some(serde_json::json!({
            "name": "x",
            "username": "x",
            "password": "x",
            "url": "https://x.example"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_responses_carry_trace_id_header() {
    let ctx = build_test_context().await.unwrap();
    use tower::util::ServiceExt;
    let resp = ctx
        .app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method("GET")
                .uri("/v1/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let trace = resp.headers().get("X-Trace-Id");
    assert!(trace.is_some());
    assert_eq!(trace.unwrap().to_str().unwrap().len(), 16);
}
