use crate::auditors::INFORMATIONAL;
use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct ManagedPolicyAuditor;

impl ManagedPolicyAuditor {
    /// A support role must exist to manage incidents with AWS Support:
    /// the AWSSupportAccess policy has to be attached to someone.
    fn check_support_access_attached(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::ManagedPolicy(config) = item.config.clone() else {
            return Ok(());
        };
        if !config.arn.contains("/AWSSupportAccess") {
            return Ok(());
        }
        if config.attached_users.is_empty()
            && config.attached_groups.is_empty()
            && config.attached_roles.is_empty()
        {
            item.add_issue(
                10,
                INFORMATIONAL,
                Some("sa-iam-cis-1.22 - AWSSupportAccess policy not created.".to_string()),
                None,
            );
        }
        Ok(())
    }
}

impl Auditor for ManagedPolicyAuditor {
    fn index(&self) -> &'static str {
        tech::MANAGED_POLICY
    }

    fn name(&self) -> &'static str {
        "ManagedPolicyAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_support_access_attached", |ctx, item| {
            self.check_support_access_attached(ctx, item)
        })]
    }
}
