use crate::auditors::INFORMATIONAL;
use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, CredReportConfig, ResourceConfig};
use auditmon_common::types::ChangeItem;
use chrono::{DateTime, Duration, Utc};

pub struct CredReportAuditor;

const UNUSED_DAYS: i64 = 90;

/// Whether a credential was last used more than the window ago. A
/// credential that was never used (`N/A` in the report) counts as
/// unused.
fn unused_beyond(last_used: Option<DateTime<Utc>>, days: i64) -> bool {
    match last_used {
        Some(date) => Utc::now() - date > Duration::days(days),
        None => true,
    }
}

fn within_24h(last_used: Option<DateTime<Utc>>) -> bool {
    last_used.is_some_and(|d| Utc::now() - d < Duration::hours(24))
}

impl CredReportAuditor {
    fn config(item: &ChangeItem) -> Option<CredReportConfig> {
        match item.config.clone() {
            ResourceConfig::CredReport(config) => Some(config),
            _ => None,
        }
    }

    /// Root account activity within the last 24 hours, over any of the
    /// password and both access keys.
    fn check_root_used_recently(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(report) = Self::config(item) else {
            return Ok(());
        };
        if !report.is_root() {
            return Ok(());
        }
        if within_24h(report.password_last_used)
            || within_24h(report.access_key_1_last_used)
            || within_24h(report.access_key_2_last_used)
        {
            item.add_issue(
                1,
                INFORMATIONAL,
                Some("sa-iam-cis-1.1 - Root account used in past 24hrs.".to_string()),
                None,
            );
        }
        Ok(())
    }

    /// Active credentials unused for 90 days or more must be disabled.
    /// One issue per stale credential.
    fn check_unused_credentials(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(report) = Self::config(item) else {
            return Ok(());
        };
        let notes =
            |what: &str| format!("sa-iam-cis-1.3 - Detected active {what} unused for over 90 days.");

        if report.password_enabled && unused_beyond(report.password_last_used, UNUSED_DAYS) {
            item.add_issue(10, INFORMATIONAL, Some(notes("password")), None);
        }
        if report.access_key_1_active && unused_beyond(report.access_key_1_last_used, UNUSED_DAYS) {
            item.add_issue(10, INFORMATIONAL, Some(notes("access key 1")), None);
        }
        if report.access_key_2_active && unused_beyond(report.access_key_2_last_used, UNUSED_DAYS) {
            item.add_issue(10, INFORMATIONAL, Some(notes("access key 2")), None);
        }
        Ok(())
    }

    /// No root account access key may exist.
    fn check_root_key_exists(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(report) = Self::config(item) else {
            return Ok(());
        };
        if report.is_root() && (report.access_key_1_active || report.access_key_2_active) {
            item.add_issue(
                10,
                INFORMATIONAL,
                Some("sa-iam-cis-1.12 - Root account has active access keys.".to_string()),
                None,
            );
        }
        Ok(())
    }

    /// MFA must be enabled on the root account.
    fn check_root_mfa(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let Some(report) = Self::config(item) else {
            return Ok(());
        };
        if report.is_root() && !report.mfa_active {
            item.add_issue(
                10,
                INFORMATIONAL,
                Some("sa-iam-cis-1.13 - Root account does not have MFA enabled.".to_string()),
                None,
            );
        }
        Ok(())
    }
}

impl Auditor for CredReportAuditor {
    fn index(&self) -> &'static str {
        tech::CRED_REPORT
    }

    fn name(&self) -> &'static str {
        "CredReportAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new("check_root_used_recently", |ctx, item| {
                self.check_root_used_recently(ctx, item)
            }),
            Check::new("check_unused_credentials", |ctx, item| {
                self.check_unused_credentials(ctx, item)
            }),
            Check::new("check_root_key_exists", |ctx, item| {
                self.check_root_key_exists(ctx, item)
            }),
            Check::new("check_root_mfa", |ctx, item| self.check_root_mfa(ctx, item)),
        ]
    }
}
