use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct ScannerAuditor;

/// Scanner severity ratings map onto scores as:
/// Low 0.0-3.9 -> 3, Medium 4.0-6.9 -> 6, High 7.0-10.0 -> 10,
/// Unknown -> 0.
fn severity_score(severity: &str) -> i32 {
    match severity {
        "Low" => 3,
        "Medium" => 6,
        "High" => 10,
        _ => 0,
    }
}

impl ScannerAuditor {
    /// One issue per vulnerability reported against the package.
    fn check_vuln_status(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::Scan(scan) = item.config.clone() else {
            return Ok(());
        };
        for vuln in &scan.vulns {
            let issue = format!("{}/{}/{}", scan.package, vuln.severity, vuln.vuln_id);
            let notes = format!(
                "Info: [{}], Fix: {}",
                vuln.information.as_deref().unwrap_or("none"),
                vuln.fix.as_deref().unwrap_or("none")
            );
            item.add_issue(severity_score(&vuln.severity), issue, Some(notes), None);
        }
        Ok(())
    }
}

impl Auditor for ScannerAuditor {
    fn index(&self) -> &'static str {
        tech::SCANNER
    }

    fn name(&self) -> &'static str {
        "ScannerAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_vuln_status", |ctx, item| {
            self.check_vuln_status(ctx, item)
        })]
    }
}
