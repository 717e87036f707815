use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct InspectorAuditor;

impl InspectorAuditor {
    /// Every Inspector finding becomes one issue; the provider's
    /// recommendation rides along as remediation instructions.
    fn check_finding(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::Inspector(finding) = item.config.clone() else {
            return Ok(());
        };
        item.add_issue(
            finding.numeric_severity as i32,
            finding.title,
            finding.description,
            finding.recommendation,
        );
        Ok(())
    }
}

impl Auditor for InspectorAuditor {
    fn index(&self) -> &'static str {
        tech::INSPECTOR
    }

    fn name(&self) -> &'static str {
        "InspectorAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_finding", |ctx, item| {
            self.check_finding(ctx, item)
        })]
    }
}
