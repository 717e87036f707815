use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct ConfigRecorderAuditor;

impl ConfigRecorderAuditor {
    /// AWS Config must record in every region.
    fn check_recorder_enabled(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::ConfigRecorder(config) = item.config.clone() else {
            return Ok(());
        };
        if !config.recorder {
            item.add_issue(
                10,
                "CIS 2.5 Ensure AWS Config Recorder is enabled in all regions",
                Some(format!(
                    "AWS Config Recorder is not enabled on {}",
                    config.region
                )),
                None,
            );
        }
        Ok(())
    }
}

impl Auditor for ConfigRecorderAuditor {
    fn index(&self) -> &'static str {
        tech::CONFIG_RECORDER
    }

    fn name(&self) -> &'static str {
        "ConfigRecorderAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_recorder_enabled", |ctx, item| {
            self.check_recorder_enabled(ctx, item)
        })]
    }
}
