use crate::context::SupportIndex;
use crate::AuditRunner;
use auditmon_common::config::{
    AccessKey, CloudTrailConfig, IamUserConfig, PasswordPolicyConfig, ResourceConfig, Route,
    RouteTableConfig, S3Config, SecurityGroupConfig, SecurityGroupRule,
};
use auditmon_common::types::ChangeItem;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

fn audit_one(item: &mut ChangeItem) {
    let support = SupportIndex::new();
    let mut runner = AuditRunner::default_battery();
    runner.audit(std::slice::from_mut(item), &support);
}

fn sg_item(rules: Vec<SecurityGroupRule>) -> ChangeItem {
    ChangeItem::new(
        "prod",
        "us-east-1",
        "web",
        None,
        ResourceConfig::SecurityGroup(SecurityGroupConfig {
            id: "sg-1".to_string(),
            name: "web".to_string(),
            vpc_id: Some("vpc-1".to_string()),
            rules,
        }),
    )
}

fn rule(rule_type: &str, proto: &str, from: i64, to: i64, cidr: &str) -> SecurityGroupRule {
    SecurityGroupRule {
        rule_type: rule_type.to_string(),
        ip_protocol: proto.to_string(),
        from_port: Some(from),
        to_port: Some(to),
        cidr_ip: Some(cidr.to_string()),
    }
}

#[test]
fn test_ssh_open_to_world_flags_each_matching_rule() {
    let mut item = sg_item(vec![
        rule("ingress", "tcp", 22, 22, "0.0.0.0/0"),
        rule("ingress", "tcp", 0, 1024, "0.0.0.0/0"),
    ]);
    audit_one(&mut item);
    let ssh: Vec<_> = item
        .issues
        .iter()
        .filter(|i| i.issue.contains("port 22"))
        .collect();
    assert_eq!(ssh.len(), 2);
    assert!(ssh.iter().all(|i| i.score == 10));
}

#[test]
fn test_egress_rule_is_not_flagged() {
    let mut item = sg_item(vec![rule("egress", "tcp", 22, 22, "0.0.0.0/0")]);
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

#[test]
fn test_restricted_cidr_is_not_flagged() {
    let mut item = sg_item(vec![rule("ingress", "tcp", 22, 22, "10.0.0.0/8")]);
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

#[test]
fn test_all_protocols_rule_counts_as_all_ports() {
    let mut item = sg_item(vec![SecurityGroupRule {
        rule_type: "ingress".to_string(),
        ip_protocol: "-1".to_string(),
        from_port: None,
        to_port: None,
        cidr_ip: Some("0.0.0.0/0".to_string()),
    }]);
    audit_one(&mut item);
    // Port 22 and 3389 checks both fire on an all-ports rule.
    assert_eq!(item.issues.len(), 2);
}

#[test]
fn test_port_range_not_containing_ssh_is_not_flagged() {
    let mut item = sg_item(vec![rule("ingress", "tcp", 80, 443, "0.0.0.0/0")]);
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

fn root_user(password_last_used: Option<chrono::DateTime<Utc>>) -> IamUserConfig {
    IamUserConfig {
        arn: "arn:aws:iam::111111111111:root".to_string(),
        user_name: "<root_account>".to_string(),
        create_date: Some(Utc::now() - Duration::days(700)),
        password_last_used,
        access_keys: vec![],
    }
}

#[test]
fn test_root_used_within_24h_adds_exactly_one_issue() {
    let mut item = ChangeItem::new(
        "prod",
        "universal",
        "<root_account>",
        None,
        ResourceConfig::IamUser(root_user(Some(Utc::now() - Duration::hours(2)))),
    );
    audit_one(&mut item);
    assert_eq!(item.issues.len(), 1);
    assert_eq!(item.issues[0].score, 1);
}

#[test]
fn test_root_used_over_24h_ago_adds_no_issue() {
    let mut item = ChangeItem::new(
        "prod",
        "universal",
        "<root_account>",
        None,
        ResourceConfig::IamUser(root_user(Some(Utc::now() - Duration::hours(48)))),
    );
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

#[test]
fn test_non_root_arn_adds_no_issue_regardless_of_timestamps() {
    let mut config = root_user(Some(Utc::now()));
    config.arn = "arn:aws:iam::111111111111:user/deploy".to_string();
    let mut item = ChangeItem::new("prod", "universal", "deploy", None, ResourceConfig::IamUser(config));
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

#[test]
fn test_root_access_key_use_scores_ten() {
    let mut config = root_user(None);
    config.password_last_used = None;
    config.create_date = Some(Utc::now() - Duration::days(700));
    config.access_keys = vec![AccessKey {
        access_key_id: "AKIA000".to_string(),
        active: true,
        create_date: Some(Utc::now() - Duration::days(400)),
        last_used_date: Some(Utc::now() - Duration::hours(1)),
    }];
    let mut item = ChangeItem::new(
        "prod",
        "universal",
        "<root_account>",
        None,
        ResourceConfig::IamUser(config),
    );
    audit_one(&mut item);
    assert_eq!(item.issues.len(), 1);
    assert_eq!(item.issues[0].score, 10);
}

fn compliant_policy() -> PasswordPolicyConfig {
    PasswordPolicyConfig {
        require_uppercase: true,
        require_lowercase: true,
        require_symbols: true,
        require_numbers: true,
        minimum_length: 14,
        reuse_prevention: Some(24),
        expire_passwords: true,
        max_password_age: Some(90),
    }
}

#[test]
fn test_missing_password_policy_raises_one_issue_per_check() {
    let mut item = ChangeItem::new(
        "prod",
        "universal",
        "",
        None,
        ResourceConfig::PasswordPolicy(None),
    );
    audit_one(&mut item);
    assert_eq!(item.issues.len(), 7);
    assert!(item
        .issues
        .iter()
        .all(|i| i.notes.as_deref().unwrap_or("").contains("no password policy")));
}

#[test]
fn test_compliant_password_policy_raises_no_issues() {
    let mut item = ChangeItem::new(
        "prod",
        "universal",
        "",
        None,
        ResourceConfig::PasswordPolicy(Some(compliant_policy())),
    );
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

#[test]
fn test_short_password_length_raises_exactly_one_issue() {
    let mut policy = compliant_policy();
    policy.minimum_length = 8;
    let mut item = ChangeItem::new(
        "prod",
        "universal",
        "",
        None,
        ResourceConfig::PasswordPolicy(Some(policy)),
    );
    audit_one(&mut item);
    assert_eq!(item.issues.len(), 1);
    assert!(item.issues[0]
        .notes
        .as_deref()
        .unwrap()
        .contains("at least 14 characters"));
}

fn trail(s3_bucket: Option<&str>) -> CloudTrailConfig {
    CloudTrailConfig {
        name: "main-trail".to_string(),
        is_multi_region_trail: true,
        trail_status: true,
        cloudwatch_logs_log_group_arn: Some(
            "arn:aws:logs:us-east-1:111111111111:log-group:trail".to_string(),
        ),
        kms_key_id: Some("arn:aws:kms:us-east-1:111111111111:key/k1".to_string()),
        s3_bucket_name: s3_bucket.map(String::from),
        metric_filters: vec![],
    }
}

fn bucket(name: &str, public: bool, logging: bool) -> ChangeItem {
    let mut grants = BTreeMap::new();
    grants.insert("owner-canonical-id".to_string(), vec!["FULL_CONTROL".to_string()]);
    if public {
        grants.insert(
            "http://acs.amazonaws.com/groups/global/AllUsers".to_string(),
            vec!["READ".to_string()],
        );
    }
    ChangeItem::new(
        "prod",
        "universal",
        name,
        Some(format!("arn:aws:s3:::{name}")),
        ResourceConfig::S3(S3Config {
            bucket_name: name.to_string(),
            owner_id: "owner-canonical-id".to_string(),
            grants,
            logging_enabled: logging,
        }),
    )
}

#[test]
fn test_cloudtrail_support_join_flags_public_log_bucket() {
    let mut items = vec![ChangeItem::new(
        "prod",
        "us-east-1",
        "main-trail",
        None,
        ResourceConfig::CloudTrail(trail(Some("trail-logs"))),
    )];
    let support = SupportIndex::from_items(&[bucket("trail-logs", true, false)]);
    AuditRunner::default_battery().audit(&mut items, &support);

    let issues: Vec<&str> = items[0].issues.iter().map(|i| i.issue.as_str()).collect();
    assert!(issues.iter().any(|i| i.contains("CIS 2.3")));
    assert!(issues.iter().any(|i| i.contains("CIS 2.6")));
}

#[test]
fn test_cloudtrail_private_logged_bucket_is_clean() {
    let mut items = vec![ChangeItem::new(
        "prod",
        "us-east-1",
        "main-trail",
        None,
        ResourceConfig::CloudTrail(trail(Some("trail-logs"))),
    )];
    let support = SupportIndex::from_items(&[bucket("trail-logs", false, true)]);
    AuditRunner::default_battery().audit(&mut items, &support);
    assert!(items[0].issues.is_empty());
}

#[test]
fn test_cloudtrail_unknown_bucket_adds_no_support_issues() {
    let mut items = vec![ChangeItem::new(
        "prod",
        "us-east-1",
        "main-trail",
        None,
        ResourceConfig::CloudTrail(trail(Some("some-other-bucket"))),
    )];
    // Support items from a different account must not match.
    let support = SupportIndex::from_items(&[ChangeItem {
        account: "staging".to_string(),
        ..bucket("some-other-bucket", true, false)
    }]);
    AuditRunner::default_battery().audit(&mut items, &support);
    assert!(items[0].issues.is_empty());
}

#[test]
fn test_malformed_route_is_contained_and_other_checks_still_run() {
    let mut item = ChangeItem::new(
        "prod",
        "us-east-1",
        "rtb-1",
        None,
        ResourceConfig::RouteTable(RouteTableConfig {
            id: "rtb-1".to_string(),
            vpc_id: None,
            routes: vec![Route {
                destination_cidr_block: Some("not-a-cidr".to_string()),
                gateway_id: None,
                vpc_peering_connection_id: Some("pcx-1".to_string()),
            }],
        }),
    );
    // The malformed CIDR errors inside the check; the pass carries on
    // and simply raises nothing for this item.
    audit_one(&mut item);
    assert!(item.issues.is_empty());
}

#[test]
fn test_wide_peering_route_is_flagged() {
    let mut item = ChangeItem::new(
        "prod",
        "us-east-1",
        "rtb-1",
        None,
        ResourceConfig::RouteTable(RouteTableConfig {
            id: "rtb-1".to_string(),
            vpc_id: None,
            routes: vec![Route {
                destination_cidr_block: Some("10.0.0.0/8".to_string()),
                gateway_id: None,
                vpc_peering_connection_id: Some("pcx-1".to_string()),
            }],
        }),
    );
    audit_one(&mut item);
    assert_eq!(item.issues.len(), 1);
}

#[test]
fn test_audit_is_idempotent_over_unchanged_items() {
    let mut first = sg_item(vec![
        rule("ingress", "tcp", 22, 22, "0.0.0.0/0"),
        rule("ingress", "tcp", 3389, 3389, "0.0.0.0/0"),
    ]);
    let mut second = first.clone();

    audit_one(&mut first);
    audit_one(&mut second);

    assert_eq!(first.issues, second.issues);
    assert!(!first.issues.is_empty());
}

#[test]
fn test_runner_tags_issues_with_auditor_class() {
    let mut item = sg_item(vec![rule("ingress", "tcp", 22, 22, "0.0.0.0/0")]);
    audit_one(&mut item);
    assert_eq!(
        item.issues[0].auditor_class.as_deref(),
        Some("SecurityGroupAuditor")
    );
}

#[test]
fn test_guardduty_finding_scores_provider_severity() {
    let mut item = ChangeItem::new(
        "prod",
        "us-east-1",
        "Probe",
        None,
        ResourceConfig::GuardDuty(serde_json::json!({
            "Severity": 8.0,
            "Title": "Unprotected port is being probed.",
            "Description": "EC2 instance has an unprotected port."
        })),
    );
    audit_one(&mut item);
    assert_eq!(item.issues.len(), 1);
    assert_eq!(item.issues[0].score, 8);
    assert_eq!(item.issues[0].issue, "Unprotected port is being probed.");
}
