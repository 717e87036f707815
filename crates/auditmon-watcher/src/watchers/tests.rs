use crate::connector::{Connector, ConnectorError, Page};
use crate::watchers::config_recorder::ConfigRecorderWatcher;
use crate::watchers::cred_report::CredReportWatcher;
use crate::watchers::guardduty::GuardDutyWatcher;
use crate::watchers::security_group::SecurityGroupWatcher;
use crate::{AccountRef, Watcher};
use auditmon_common::config::{CredReportConfig, SecurityGroupConfig, SecurityGroupRule};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn account(name: &str, identifier: &str) -> AccountRef {
    AccountRef {
        name: name.to_string(),
        identifier: identifier.to_string(),
        ignore_list: Vec::new(),
    }
}

fn sg(id: &str, name: &str) -> SecurityGroupConfig {
    SecurityGroupConfig {
        id: id.to_string(),
        name: name.to_string(),
        vpc_id: Some("vpc-1".to_string()),
        rules: vec![SecurityGroupRule {
            rule_type: "ingress".to_string(),
            ip_protocol: "tcp".to_string(),
            from_port: Some(443),
            to_port: Some(443),
            cidr_ip: Some("10.0.0.0/8".to_string()),
        }],
    }
}

/// Two pages of security groups for `good`, auth failure for `bad`.
struct PagedConnector;

#[async_trait::async_trait]
impl Connector for PagedConnector {
    async fn list_regions(&self, _account: &str) -> Result<Vec<String>, ConnectorError> {
        Ok(vec!["us-east-1".to_string()])
    }

    async fn list_security_groups(
        &self,
        account: &str,
        _region: &str,
        next_token: Option<&str>,
    ) -> Result<Page<SecurityGroupConfig>, ConnectorError> {
        if account == "bad" {
            return Err(ConnectorError::Auth("expired role".to_string()));
        }
        match next_token {
            None => Ok(Page {
                items: vec![sg("sg-1", "web"), sg("sg-2", "db")],
                next_token: Some("page-2".to_string()),
            }),
            Some("page-2") => Ok(Page::last(vec![sg("sg-3", "bastion")])),
            Some(other) => Err(ConnectorError::Api(format!("bad token {other}"))),
        }
    }
}

#[tokio::test]
async fn test_security_group_pagination_collects_all_pages() {
    let watcher = SecurityGroupWatcher::new(Arc::new(PagedConnector));
    let result = watcher.slurp(&[account("good", "111111111111")]).await;

    assert_eq!(result.items.len(), 3);
    assert!(result.exceptions.is_empty());
    assert_eq!(result.items[0].index, "securitygroup");
    assert_eq!(
        result.items[0].arn.as_deref(),
        Some("arn:aws:ec2:us-east-1:111111111111:security-group/sg-1")
    );
}

#[tokio::test]
async fn test_partial_failure_does_not_block_other_accounts() {
    let watcher = SecurityGroupWatcher::new(Arc::new(PagedConnector));
    let result = watcher
        .slurp(&[account("bad", "222222222222"), account("good", "111111111111")])
        .await;

    assert_eq!(result.items.len(), 3);
    assert_eq!(result.exceptions.len(), 1);
    assert!(result.exceptions.contains_key(&(
        "securitygroup".to_string(),
        "bad".to_string(),
        "us-east-1".to_string()
    )));
}

#[tokio::test]
async fn test_ignore_list_filters_by_glob() {
    let watcher = SecurityGroupWatcher::new(Arc::new(PagedConnector));
    let mut acct = account("good", "111111111111");
    acct.ignore_list = vec!["ba*".to_string()];

    let result = watcher.slurp(&[acct]).await;
    let names: Vec<&str> = result.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["web", "db"]);
}

/// Credential report that becomes ready on the third poll.
struct SlowReportConnector {
    polls: AtomicU32,
    ready_after: u32,
}

#[async_trait::async_trait]
impl Connector for SlowReportConnector {
    async fn fetch_credential_report(
        &self,
        _account: &str,
    ) -> Result<Option<Vec<CredReportConfig>>, ConnectorError> {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if polls < self.ready_after {
            return Ok(None);
        }
        Ok(Some(vec![CredReportConfig {
            user: "<root_account>".to_string(),
            arn: "arn:aws:iam::111111111111:root".to_string(),
            password_enabled: false,
            password_last_used: None,
            access_key_1_active: false,
            access_key_1_last_used: None,
            access_key_2_active: false,
            access_key_2_last_used: None,
            mfa_active: true,
        }]))
    }
}

#[tokio::test]
async fn test_cred_report_polls_until_ready() {
    let connector = Arc::new(SlowReportConnector {
        polls: AtomicU32::new(0),
        ready_after: 3,
    });
    let watcher = CredReportWatcher::new(connector.clone())
        .with_polling(5, Duration::from_millis(1));

    let result = watcher.slurp(&[account("prod", "111111111111")]).await;
    assert_eq!(result.items.len(), 1);
    assert!(result.exceptions.is_empty());
    assert_eq!(connector.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cred_report_timeout_is_recorded_not_fatal() {
    let connector = Arc::new(SlowReportConnector {
        polls: AtomicU32::new(0),
        ready_after: 100,
    });
    let watcher =
        CredReportWatcher::new(connector).with_polling(2, Duration::from_millis(1));

    let result = watcher.slurp(&[account("prod", "111111111111")]).await;
    assert!(result.items.is_empty());
    let err = result
        .exceptions
        .get(&(
            "credreport".to_string(),
            "prod".to_string(),
            "universal".to_string(),
        ))
        .expect("timeout should be recorded");
    assert!(err.to_string().contains("not ready"));
}

/// One region with a recorder, one without.
struct RecorderConnector;

#[async_trait::async_trait]
impl Connector for RecorderConnector {
    async fn list_regions(&self, _account: &str) -> Result<Vec<String>, ConnectorError> {
        Ok(vec!["us-east-1".to_string(), "eu-west-1".to_string()])
    }

    async fn describe_config_recorders(
        &self,
        _account: &str,
        region: &str,
    ) -> Result<Vec<String>, ConnectorError> {
        if region == "us-east-1" {
            Ok(vec!["default".to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}

#[tokio::test]
async fn test_config_recorder_reports_only_missing_regions() {
    let watcher = ConfigRecorderWatcher::new(Arc::new(RecorderConnector));
    let result = watcher.slurp(&[account("prod", "111111111111")]).await;

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].region, "eu-west-1");
}

/// One detector with finding ids split across two pages.
struct GuardDutyConnector;

#[async_trait::async_trait]
impl Connector for GuardDutyConnector {
    async fn list_detectors(
        &self,
        _account: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<String>, ConnectorError> {
        Ok(Page::last(vec!["detector-1".to_string()]))
    }

    async fn list_finding_ids(
        &self,
        _account: &str,
        _detector_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<String>, ConnectorError> {
        match next_token {
            None => Ok(Page {
                items: vec!["f-1".to_string()],
                next_token: Some("more".to_string()),
            }),
            Some(_) => Ok(Page::last(vec!["f-2".to_string()])),
        }
    }

    async fn get_findings(
        &self,
        _account: &str,
        _detector_id: &str,
        finding_ids: &[String],
    ) -> Result<Vec<serde_json::Value>, ConnectorError> {
        Ok(finding_ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "Arn": format!("arn:aws:guardduty:us-east-1:111111111111:finding/{id}"),
                    "Region": "us-east-1",
                    "Title": format!("Probe {id}"),
                    "Severity": 5.0
                })
            })
            .collect())
    }
}

#[tokio::test]
async fn test_guardduty_paginates_detectors_and_findings() {
    let watcher = GuardDutyWatcher::new(Arc::new(GuardDutyConnector));
    let result = watcher.slurp(&[account("prod", "111111111111")]).await;

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].name, "Probe f-1");
    assert_eq!(result.items[1].name, "Probe f-2");
    assert_eq!(result.items[0].region, "us-east-1");
}
