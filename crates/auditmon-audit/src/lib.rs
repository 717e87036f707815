//! Rule batteries that score resource snapshots.
//!
//! An [`Auditor`] declares a fixed, enumerable set of named checks for
//! one technology. The [`AuditRunner`] invokes every check against
//! every matching item; each check is an independent predicate over the
//! item's typed config that calls `add_issue` when a weakness holds.
//! A failing check is contained per check-per-item and never aborts
//! the pass.

pub mod auditors;
pub mod context;

#[cfg(test)]
mod tests;

use auditmon_common::types::ChangeItem;
pub use context::{AuditContext, SupportIndex};

/// Failure inside one check against one item, e.g. a config field that
/// survived typing but cannot be interpreted. Contained by the runner.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("malformed config field: {0}")]
    Malformed(String),
}

/// One named check of an auditor's battery.
pub struct Check<'a> {
    pub name: &'static str,
    #[allow(clippy::type_complexity)]
    pub run: Box<dyn Fn(&AuditContext<'_>, &mut ChangeItem) -> Result<(), AuditError> + Send + Sync + 'a>,
}

impl<'a> Check<'a> {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(&AuditContext<'_>, &mut ChangeItem) -> Result<(), AuditError> + Send + Sync + 'a,
    {
        Self {
            name,
            run: Box::new(run),
        }
    }
}

/// A rule battery for one technology.
pub trait Auditor: Send + Sync {
    /// Technology index this auditor applies to.
    fn index(&self) -> &'static str;

    /// Auditor class name recorded on the findings it raises.
    fn name(&self) -> &'static str;

    /// Technologies whose current items this auditor cross-references
    /// at audit time (read-only join, no subscription).
    fn support_indexes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Per-run initialization, invoked once before any check method.
    fn prep_for_audit(&mut self) {}

    /// The fixed battery of checks.
    fn checks(&self) -> Vec<Check<'_>>;
}

/// Runs every auditor's battery over a slurped item set.
pub struct AuditRunner {
    auditors: Vec<Box<dyn Auditor>>,
}

impl AuditRunner {
    pub fn new(auditors: Vec<Box<dyn Auditor>>) -> Self {
        Self { auditors }
    }

    /// The full built-in battery.
    pub fn default_battery() -> Self {
        Self::new(vec![
            Box::new(auditors::security_group::SecurityGroupAuditor),
            Box::new(auditors::iam_user::IamUserAuditor),
            Box::new(auditors::cred_report::CredReportAuditor),
            Box::new(auditors::password_policy::PasswordPolicyAuditor),
            Box::<auditors::cloud_trail::CloudTrailAuditor>::default(),
            Box::new(auditors::route_table::RouteTableAuditor),
            Box::new(auditors::config_recorder::ConfigRecorderAuditor),
            Box::new(auditors::ec2_instance::Ec2InstanceAuditor),
            Box::new(auditors::managed_policy::ManagedPolicyAuditor),
            Box::new(auditors::guardduty::GuardDutyAuditor),
            Box::new(auditors::inspector::InspectorAuditor),
            Box::new(auditors::scanner::ScannerAuditor),
        ])
    }

    /// Audit every item whose technology matches a registered auditor.
    ///
    /// Checks are pure evaluators over the item's config; the only
    /// mutation is appending issues. A check returning an error is
    /// logged for that (check, item) pair and the pass continues.
    pub fn audit(&mut self, items: &mut [ChangeItem], support: &SupportIndex) {
        let ctx = AuditContext::new(support);

        for auditor in &mut self.auditors {
            auditor.prep_for_audit();
            let checks = auditor.checks();
            let index = auditor.index();
            let class_name = auditor.name();

            for item in items.iter_mut().filter(|i| i.index == index) {
                let raised_from = item.issues.len();
                for check in &checks {
                    if let Err(e) = (check.run)(&ctx, item) {
                        tracing::warn!(
                            auditor = class_name,
                            check = check.name,
                            item = %item.name,
                            account = %item.account,
                            error = %e,
                            "Check failed for item, continuing audit pass"
                        );
                    }
                }
                for issue in &mut item.issues[raised_from..] {
                    issue.auditor_class = Some(class_name.to_string());
                }
            }
        }
    }
}
