use crate::store::Store;
use crate::AccountRow;
use auditmon_common::config::{ConfigRecorderConfig, InspectorConfig, ResourceConfig};
use auditmon_common::id::next_id;
use auditmon_common::types::{ChangeItem, IssueDraft};
use chrono::Utc;

async fn test_store() -> Store {
    auditmon_common::id::init(1, 1);
    Store::new("sqlite::memory:")
        .await
        .expect("in-memory store should initialize")
}

async fn seed_account(store: &Store, name: &str, identifier: &str) -> AccountRow {
    store
        .insert_account(&AccountRow {
            id: next_id(),
            name: name.to_string(),
            identifier: identifier.to_string(),
            active: true,
            third_party: false,
            notify_emails: vec!["secops@example.org".to_string()],
            ignore_list: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .expect("account should insert")
}

fn recorder_item(account: &str, region: &str, recorder: bool) -> ChangeItem {
    ChangeItem::new(
        account,
        region,
        "",
        None,
        ResourceConfig::ConfigRecorder(ConfigRecorderConfig {
            region: region.to_string(),
            recorder,
        }),
    )
}

fn draft(score: i32, issue: &str, notes: Option<&str>) -> IssueDraft {
    IssueDraft {
        score,
        issue: issue.to_string(),
        notes: notes.map(|s| s.to_string()),
        action_instructions: None,
        auditor_class: Some("TestAuditor".to_string()),
    }
}

#[tokio::test]
async fn test_store_change_item_creates_item_and_revision() {
    let store = test_store().await;
    seed_account(&store, "prod", "111111111111").await;

    let stored = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .expect("store should succeed");

    assert!(stored.changed);
    assert_eq!(store.count_items().await.unwrap(), 1);
    assert_eq!(store.count_revisions().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unchanged_config_does_not_create_revision() {
    let store = test_store().await;
    seed_account(&store, "prod", "111111111111").await;
    let item = recorder_item("prod", "us-east-1", false);

    let first = store.store_change_item(&item, &[]).await.unwrap();
    let second = store.store_change_item(&item, &[]).await.unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(first.revision_id, second.revision_id);
    assert_eq!(store.count_revisions().await.unwrap(), 1);

    // The ephemeral-change marker moved on the existing revision.
    let revisions = store.list_revisions(&first.item_id, 10, 0).await.unwrap();
    assert!(revisions[0].date_last_ephemeral_change.is_some());
}

#[tokio::test]
async fn test_changed_config_appends_revision_and_retires_previous() {
    let store = test_store().await;
    seed_account(&store, "prod", "111111111111").await;

    let first = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .unwrap();
    let second = store
        .store_change_item(&recorder_item("prod", "us-east-1", true), &[])
        .await
        .unwrap();

    assert!(second.changed);
    assert_ne!(first.revision_id, second.revision_id);
    assert_eq!(store.count_revisions().await.unwrap(), 2);

    let revisions = store.list_revisions(&first.item_id, 10, 0).await.unwrap();
    let active: Vec<_> = revisions.iter().filter(|r| r.active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.revision_id);
}

#[tokio::test]
async fn test_ephemeral_only_change_is_a_no_op() {
    let store = test_store().await;
    seed_account(&store, "prod", "111111111111").await;

    let mut item = ChangeItem::new(
        "prod",
        "us-east-1",
        "finding-1",
        Some("arn:aws:inspector:us-east-1:111111111111:finding/1".to_string()),
        ResourceConfig::Inspector(InspectorConfig {
            arn: "arn:aws:inspector:us-east-1:111111111111:finding/1".to_string(),
            title: "Outdated kernel".to_string(),
            description: None,
            recommendation: None,
            numeric_severity: 7.0,
            created_at: Some("2026-08-01T00:00:00Z".to_string()),
            updated_at: Some("2026-08-01T00:00:00Z".to_string()),
        }),
    );

    let ephemerals = &["created_at", "updated_at"];
    let first = store.store_change_item(&item, ephemerals).await.unwrap();

    if let ResourceConfig::Inspector(ref mut cfg) = item.config {
        cfg.updated_at = Some("2026-08-07T00:00:00Z".to_string());
    }
    let second = store.store_change_item(&item, ephemerals).await.unwrap();

    assert!(!second.changed);
    assert_eq!(first.revision_id, second.revision_id);
    assert_eq!(store.count_revisions().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reconcile_marks_unraised_issues_fixed() {
    let store = test_store().await;
    let account = seed_account(&store, "prod", "111111111111").await;
    let stored = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .unwrap();
    let tech = store
        .find_or_create_technology("configrecorder")
        .await
        .unwrap();

    let drafts = vec![
        draft(10, "Recorder disabled", Some("us-east-1")),
        draft(5, "Partial coverage", None),
    ];
    let (inserted, fixed) = store
        .reconcile_issues(&stored.item_id, &tech.id, &account.id, &drafts)
        .await
        .unwrap();
    assert_eq!((inserted, fixed), (2, 0));

    // Second pass raises only one of the two: the other must be fixed.
    let drafts = vec![draft(10, "Recorder disabled", Some("us-east-1"))];
    let (inserted, fixed) = store
        .reconcile_issues(&stored.item_id, &tech.id, &account.id, &drafts)
        .await
        .unwrap();
    assert_eq!((inserted, fixed), (0, 1));

    // Third identical pass is a no-op.
    let (inserted, fixed) = store
        .reconcile_issues(&stored.item_id, &tech.id, &account.id, &drafts)
        .await
        .unwrap();
    assert_eq!((inserted, fixed), (0, 0));
    assert_eq!(store.count_item_audits().await.unwrap(), 2);
}

#[tokio::test]
async fn test_guardduty_ingest_creates_full_chain() {
    let store = test_store().await;
    seed_account(&store, "TEST", "123").await;

    let event = serde_json::json!({
        "account": "123",
        "region": "us-east-1",
        "detail": {
            "type": "Recon:EC2/PortProbeUnprotectedPort",
            "severity": 2,
            "title": "Unprotected port is being probed.",
            "description": "EC2 instance has an unprotected port."
        }
    });

    let outcome = store.ingest_guardduty_event(&event).await.unwrap();
    assert!(!outcome.event_id.is_empty());
    assert_eq!(store.count_items().await.unwrap(), 1);
    assert_eq!(store.count_revisions().await.unwrap(), 1);
    assert_eq!(store.count_item_audits().await.unwrap(), 1);
    assert_eq!(store.count_auditor_settings().await.unwrap(), 1);
    assert_eq!(store.count_guardduty_events().await.unwrap(), 1);
}

#[tokio::test]
async fn test_guardduty_ingest_unknown_account_errors() {
    let store = test_store().await;
    let event = serde_json::json!({
        "account": "999",
        "region": "us-east-1",
        "detail": {"type": "Recon:EC2/Portscan", "severity": 5, "title": "t"}
    });
    assert!(store.ingest_guardduty_event(&event).await.is_err());
}

#[tokio::test]
async fn test_severity_buckets_use_canonical_banding() {
    let store = test_store().await;
    let account = seed_account(&store, "prod", "111111111111").await;
    let stored = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .unwrap();
    let tech = store
        .find_or_create_technology("configrecorder")
        .await
        .unwrap();

    let drafts = vec![
        draft(1, "low finding", None),
        draft(5, "medium finding", None),
        draft(10, "upper medium finding", None),
        draft(11, "high finding", None),
    ];
    store
        .reconcile_issues(&stored.item_id, &tech.id, &account.id, &drafts)
        .await
        .unwrap();

    let buckets = store.vulnerabilities_by_severity(None).await.unwrap();
    assert_eq!(buckets.low, 1);
    assert_eq!(buckets.medium, 2);
    assert_eq!(buckets.high, 1);

    let filtered = store
        .vulnerabilities_by_severity(Some(&["other".to_string()]))
        .await
        .unwrap();
    assert_eq!(filtered.low + filtered.medium + filtered.high, 0);
}

#[tokio::test]
async fn test_top_findings_respect_reportable_threshold_and_noise() {
    let store = test_store().await;
    let account = seed_account(&store, "prod", "111111111111").await;
    let stored = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .unwrap();
    let tech = store
        .find_or_create_technology("configrecorder")
        .await
        .unwrap();

    let drafts = vec![
        draft(10, "Reportable finding", None),
        draft(10, "Egress noise", Some("[egress:0.0.0.0/0]")),
        draft(3, "Low severity finding", None),
    ];
    store
        .reconcile_issues(&stored.item_id, &tech.id, &account.id, &drafts)
        .await
        .unwrap();

    let section = store.top_findings_by_account("prod", 5).await.unwrap();
    assert_eq!(section.count, 1);
    assert_eq!(section.items[0].issue, "Reportable finding");
}

#[tokio::test]
async fn test_justified_findings_appear_in_recent_justified() {
    let store = test_store().await;
    let account = seed_account(&store, "prod", "111111111111").await;
    let stored = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .unwrap();
    let tech = store
        .find_or_create_technology("configrecorder")
        .await
        .unwrap();
    store
        .reconcile_issues(
            &stored.item_id,
            &tech.id,
            &account.id,
            &[draft(10, "Recorder disabled", None)],
        )
        .await
        .unwrap();

    // Find the audit row and justify it.
    use crate::entities::item_audit::Entity as AuditEntity;
    use sea_orm::EntityTrait;
    let audits = AuditEntity::find().all(store.db()).await.unwrap();
    store
        .justify_issue(&audits[0].id, "known and accepted")
        .await
        .unwrap();

    let section = store
        .recent_justified_findings("prod", 1, 10)
        .await
        .unwrap();
    assert_eq!(section.count, 1);
    assert_eq!(section.items[0].finding, "Recorder disabled");
    assert!(section.items[0].justified_date.is_some());

    // Justified issues no longer count as open.
    let buckets = store.vulnerabilities_by_severity(None).await.unwrap();
    assert_eq!(buckets.low + buckets.medium + buckets.high, 0);
}

#[tokio::test]
async fn test_recent_guardduty_feed_uses_looser_threshold() {
    let store = test_store().await;
    seed_account(&store, "TEST", "123").await;

    let event = |severity: i64, title: &str| {
        serde_json::json!({
            "account": "123",
            "region": "us-east-1",
            "detail": {
                "type": format!("Recon:EC2/{title}"),
                "severity": severity,
                "title": title,
                "description": "probe"
            }
        })
    };
    store
        .ingest_guardduty_event(&event(5, "AboveThreshold"))
        .await
        .unwrap();
    store
        .ingest_guardduty_event(&event(2, "BelowThreshold"))
        .await
        .unwrap();

    let section = store
        .recent_guardduty_findings("TEST", 1, 10)
        .await
        .unwrap();
    assert_eq!(section.count, 1);
    assert_eq!(section.items[0].finding, "AboveThreshold");

    // The severity-5 finding is below the reportable cut used by the
    // main summary sections.
    let reportable = store.recent_findings("TEST", 1, 10).await.unwrap();
    assert_eq!(reportable.count, 0);
}

#[tokio::test]
async fn test_guardduty_geo_aggregation() {
    let store = test_store().await;
    seed_account(&store, "TEST", "123").await;

    let probe = |lat: f64, lon: f64, country: &str, city: &str| {
        serde_json::json!({
            "remoteIpDetails": {
                "geoLocation": {"lat": lat, "lon": lon},
                "country": {"countryName": country},
                "city": {"cityName": city},
                "ipAddressV4": "203.0.113.9",
                "organization": {"org": "ExampleNet", "isp": "ExampleNet", "asn": 64500, "asnOrg": "ExampleNet"}
            },
            "localPortDetails": {"port": 22, "portName": "SSH"}
        })
    };
    let event = serde_json::json!({
        "account": "123",
        "region": "us-east-1",
        "detail": {
            "type": "Recon:EC2/PortProbeUnprotectedPort",
            "severity": 2,
            "title": "probe",
            "description": "probe",
            "service": {"action": {"portProbeAction": {"portProbeDetails": [
                probe(37.51, 126.97, "South Korea", "Seoul"),
                probe(37.51, 126.97, "South Korea", "Seoul"),
                probe(32.8, -117.13, "United States", "San Diego")
            ]}}}
        }
    });
    store.ingest_guardduty_event(&event).await.unwrap();

    let points = store.guardduty_map_points(None).await.unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].count, 2);
    assert_eq!(points[0].country_name.as_deref(), Some("South Korea"));

    let countries = store.guardduty_top_countries(None, 10).await.unwrap();
    assert_eq!(countries[0].country_name, "South Korea");
    assert_eq!(countries[0].count, 2);

    let filtered = store
        .guardduty_map_points(Some(&["other-account".to_string()]))
        .await
        .unwrap();
    assert!(filtered.is_empty());
}

#[tokio::test]
async fn test_scanner_config_crud() {
    let store = test_store().await;

    let created = store
        .insert_scanner_config("primary", "svc", "secret", "https://scanner.example", true)
        .await
        .unwrap();
    assert_eq!(store.count_scanner_configs().await.unwrap(), 1);

    let fetched = store.get_scanner_config(&created.id).await.unwrap();
    assert_eq!(fetched.unwrap().name, "primary");

    let updated = store
        .update_scanner_config(
            &created.id,
            "primary",
            "svc",
            "rotated",
            "https://scanner.example",
            false,
        )
        .await
        .unwrap();
    assert_eq!(updated.password, "rotated");
    assert!(!updated.ssl_verify);

    assert!(store.delete_scanner_config(&created.id).await.unwrap());
    assert_eq!(store.count_scanner_configs().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ticket_source_picks_highest_score() {
    let store = test_store().await;
    let account = seed_account(&store, "prod", "111111111111").await;
    let stored = store
        .store_change_item(&recorder_item("prod", "us-east-1", false), &[])
        .await
        .unwrap();
    let tech = store
        .find_or_create_technology("configrecorder")
        .await
        .unwrap();
    store
        .reconcile_issues(
            &stored.item_id,
            &tech.id,
            &account.id,
            &[
                draft(3, "minor", None),
                draft(10, "Recorder disabled", Some("us-east-1")),
            ],
        )
        .await
        .unwrap();

    let source = store.ticket_source(&stored.item_id).await.unwrap().unwrap();
    assert_eq!(source.score, 10);
    assert_eq!(source.issue, "Recorder disabled");
    assert_eq!(source.account_identifier, "111111111111");
    assert!(source.config.is_some());
}

#[test]
fn test_masked_identifier_keeps_last_four() {
    assert_eq!(
        crate::masked_identifier("150676063069"),
        "XXXXXXXX3069"
    );
}
