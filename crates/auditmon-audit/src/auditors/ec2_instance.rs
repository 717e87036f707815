use crate::auditors::INFORMATIONAL;
use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct Ec2InstanceAuditor;

impl Ec2InstanceAuditor {
    /// Instances must use IAM roles for AWS resource access.
    fn check_instance_role_assigned(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::Ec2Instance(config) = item.config.clone() else {
            return Ok(());
        };
        if config.iam_instance_profile.is_none() {
            item.add_issue(
                10,
                INFORMATIONAL,
                Some("sa-iam-cis-1.21 - Instance not assigned IAM role for EC2.".to_string()),
                None,
            );
        }
        Ok(())
    }
}

impl Auditor for Ec2InstanceAuditor {
    fn index(&self) -> &'static str {
        tech::EC2_INSTANCE
    }

    fn name(&self) -> &'static str {
        "Ec2InstanceAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_instance_role_assigned", |ctx, item| {
            self.check_instance_role_assigned(ctx, item)
        })]
    }
}
