use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct GuardDutyAuditor;

impl GuardDutyAuditor {
    /// Every GuardDuty finding becomes one issue, scored with the
    /// provider's own severity.
    fn check_finding(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::GuardDuty(finding) = item.config.clone() else {
            return Ok(());
        };
        if finding.is_null() {
            return Ok(());
        }
        let score = finding
            .get("Severity")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as i32;
        let title = finding
            .get("Title")
            .and_then(|v| v.as_str())
            .unwrap_or("GuardDuty finding")
            .to_string();
        let notes = finding
            .get("Description")
            .and_then(|v| v.as_str())
            .map(String::from);
        item.add_issue(score, title, notes, None);
        Ok(())
    }
}

impl Auditor for GuardDutyAuditor {
    fn index(&self) -> &'static str {
        tech::GUARD_DUTY
    }

    fn name(&self) -> &'static str {
        "GuardDuty"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_finding", |ctx, item| {
            self.check_finding(ctx, item)
        })]
    }
}
