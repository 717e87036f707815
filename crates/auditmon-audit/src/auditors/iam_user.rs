use crate::auditors::INFORMATIONAL;
use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;
use chrono::{Duration, Utc};

pub struct IamUserAuditor;

impl IamUserAuditor {
    /// Use of the root account within the last 24 hours. A console
    /// login scores 1; an access-key use scores 10.
    fn check_root_used_recently(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::IamUser(config) = item.config.clone() else {
            return Ok(());
        };
        if !config.is_root() {
            return Ok(());
        }

        let one_day_ago = Utc::now() - Duration::hours(24);
        let notes = "sa-iam-cis-1.1 - Root account used in past 24hrs.".to_string();

        let last_used = config.password_last_used.or(config.create_date);
        if last_used.is_some_and(|d| d > one_day_ago) {
            item.add_issue(1, INFORMATIONAL, Some(notes), None);
            return Ok(());
        }

        for key in &config.access_keys {
            let last_used = key.last_used_date.or(key.create_date);
            if last_used.is_some_and(|d| d > one_day_ago) {
                item.add_issue(10, INFORMATIONAL, Some(notes), None);
                return Ok(());
            }
        }
        Ok(())
    }
}

impl Auditor for IamUserAuditor {
    fn index(&self) -> &'static str {
        tech::IAM_USER
    }

    fn name(&self) -> &'static str {
        "IamUserAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_root_used_recently", |ctx, item| {
            self.check_root_used_recently(ctx, item)
        })]
    }
}
