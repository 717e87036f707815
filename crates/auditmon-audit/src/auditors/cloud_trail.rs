use crate::auditors::metric_filters::{
    matching_filters_without_alarm, ROOT_USAGE_PATTERNS, UNAUTHORIZED_API_PATTERNS,
};
use crate::auditors::INFORMATIONAL;
use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, CloudTrailConfig, ResourceConfig, S3Config};
use auditmon_common::types::ChangeItem;

/// Grantee URIs that expose a bucket to the internet at large.
const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/allusers";
const AUTHENTICATED_USERS: &str = "http://acs.amazonaws.com/groups/global/authenticatedusers";

#[derive(Default)]
pub struct CloudTrailAuditor {
    internet_accessible: Vec<String>,
}

impl CloudTrailAuditor {
    fn config(item: &ChangeItem) -> Option<CloudTrailConfig> {
        match item.config.clone() {
            ResourceConfig::CloudTrail(config) => Some(config),
            _ => None,
        }
    }

    /// The trail's log bucket among the account's current S3 items.
    fn log_bucket<'a>(
        ctx: &'a AuditContext<'_>,
        item: &ChangeItem,
        bucket_name: &str,
    ) -> Option<S3Config> {
        ctx.support_items(tech::S3, &item.account)
            .iter()
            .find(|s3| s3.name == bucket_name)
            .and_then(|s3| match &s3.config {
                ResourceConfig::S3(config) => Some(config.clone()),
                _ => None,
            })
    }

    fn check_multi_region(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        if !config.is_multi_region_trail {
            item.add_issue(10, "POLICY - CloudTrail is not enabled for multi-region", None, None);
        }
        Ok(())
    }

    fn check_enabled(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        if !config.trail_status {
            item.add_issue(10, "POLICY - CloudTrail is disabled", None, None);
        }
        Ok(())
    }

    /// Trails must be integrated with CloudWatch Logs.
    fn check_cloudwatch_logs_integration(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        let integrated = config
            .cloudwatch_logs_log_group_arn
            .as_deref()
            .is_some_and(|arn| arn.contains("arn:aws:logs"));
        if !integrated {
            item.add_issue(
                10,
                INFORMATIONAL,
                Some("sa-log-cis-2.4 - CloudTrails without CloudWatch Logs discovered.".to_string()),
                None,
            );
        }
        Ok(())
    }

    /// Trail logs must be encrypted at rest with a KMS CMK.
    fn check_logs_encrypted(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        if config.kms_key_id.is_none() {
            item.add_issue(
                10,
                INFORMATIONAL,
                Some(
                    "sa-log-cis-2.7 - CloudTrail not using KMS CMK for encryption discovered."
                        .to_string(),
                ),
                None,
            );
        }
        Ok(())
    }

    fn metric_filter_check(
        item: &mut ChangeItem,
        config: &CloudTrailConfig,
        patterns: &[&str],
        rule: &str,
        shortfall: &str,
    ) {
        let notes = format!("{rule} - {shortfall}");
        if config.cloudwatch_logs_log_group_arn.is_none() {
            item.add_issue(10, INFORMATIONAL, Some(notes), None);
            return;
        }
        for _filter in matching_filters_without_alarm(&config.metric_filters, patterns) {
            item.add_issue(10, INFORMATIONAL, Some(notes.clone()), None);
        }
    }

    /// A log metric filter and alarm must exist for unauthorized API calls.
    fn check_metric_filter_unauthorized_api_calls(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        Self::metric_filter_check(
            item,
            &config,
            UNAUTHORIZED_API_PATTERNS,
            "sa-mon-cis-3.1",
            "Incorrect log metric alerts for unauthorized_api_calls.",
        );
        Ok(())
    }

    /// A log metric filter and alarm must exist for root account usage.
    fn check_metric_filter_root_usage(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        Self::metric_filter_check(
            item,
            &config,
            ROOT_USAGE_PATTERNS,
            "sa-mon-cis-3.3",
            "Incorrect log metric alerts for root usage.",
        );
        Ok(())
    }

    /// The S3 bucket the trail logs to must not be publicly accessible.
    fn check_log_bucket_public_access(
        &self,
        ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        let Some(bucket_name) = config.s3_bucket_name.as_deref() else {
            return Ok(());
        };
        let Some(bucket) = Self::log_bucket(ctx, item, bucket_name) else {
            return Ok(());
        };

        let owner = bucket.owner_id.to_lowercase();
        for (grantee, permissions) in &bucket.grants {
            let grantee_lower = grantee.to_lowercase();
            if !self.internet_accessible.contains(&grantee_lower) {
                continue;
            }
            if grantee_lower == owner {
                continue;
            }
            let issue = format!(
                "CIS 2.3 Ensure the S3 bucket CloudTrail logs to is not publicly accessible - {bucket_name} has {}",
                permissions.first().map(String::as_str).unwrap_or("GRANT")
            );
            let notes = format!("ACL:{grantee}");
            item.add_issue(10, issue, Some(notes), None);
        }
        Ok(())
    }

    /// Access logging must be enabled on the trail's S3 bucket.
    fn check_log_bucket_access_logging(
        &self,
        ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(config) = Self::config(item) else {
            return Ok(());
        };
        let Some(bucket_name) = config.s3_bucket_name.as_deref() else {
            return Ok(());
        };
        let Some(bucket) = Self::log_bucket(ctx, item, bucket_name) else {
            return Ok(());
        };
        if !bucket.logging_enabled {
            let notes =
                format!("Access Logging is not enabled on CloudTrail S3 bucket {bucket_name}");
            item.add_issue(
                10,
                "CIS 2.6 Ensure S3 bucket access logging is enabled on the CloudTrail S3 bucket",
                Some(notes),
                None,
            );
        }
        Ok(())
    }
}

impl Auditor for CloudTrailAuditor {
    fn index(&self) -> &'static str {
        tech::CLOUD_TRAIL
    }

    fn name(&self) -> &'static str {
        "CloudTrailAuditor"
    }

    fn support_indexes(&self) -> &'static [&'static str] {
        &[tech::S3]
    }

    fn prep_for_audit(&mut self) {
        self.internet_accessible = vec![ALL_USERS.to_string(), AUTHENTICATED_USERS.to_string()];
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new("check_multi_region", |ctx, item| {
                self.check_multi_region(ctx, item)
            }),
            Check::new("check_enabled", |ctx, item| self.check_enabled(ctx, item)),
            Check::new("check_cloudwatch_logs_integration", |ctx, item| {
                self.check_cloudwatch_logs_integration(ctx, item)
            }),
            Check::new("check_logs_encrypted", |ctx, item| {
                self.check_logs_encrypted(ctx, item)
            }),
            Check::new("check_metric_filter_unauthorized_api_calls", |ctx, item| {
                self.check_metric_filter_unauthorized_api_calls(ctx, item)
            }),
            Check::new("check_metric_filter_root_usage", |ctx, item| {
                self.check_metric_filter_root_usage(ctx, item)
            }),
            Check::new("check_log_bucket_public_access", |ctx, item| {
                self.check_log_bucket_public_access(ctx, item)
            }),
            Check::new("check_log_bucket_access_logging", |ctx, item| {
                self.check_log_bucket_access_logging(ctx, item)
            }),
        ]
    }
}
