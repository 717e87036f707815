use crate::auditors::INFORMATIONAL;
use crate::{Auditor, Check};
use auditmon_common::config::{tech, PasswordPolicyConfig, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct PasswordPolicyAuditor;

/// Evaluate one policy requirement. Every check raises its own
/// "no password policy" issue when the account has none at all, exactly
/// like it raises its own issue when the configured policy falls short.
fn policy_check(
    item: &mut ChangeItem,
    rule: &str,
    shortfall: &str,
    violated: impl Fn(&PasswordPolicyConfig) -> bool,
) {
    let ResourceConfig::PasswordPolicy(policy) = item.config.clone() else {
        return;
    };
    match policy {
        None => item.add_issue(
            10,
            INFORMATIONAL,
            Some(format!("{rule} - Account has no password policy.")),
            None,
        ),
        Some(policy) if violated(&policy) => {
            item.add_issue(10, INFORMATIONAL, Some(format!("{rule} - {shortfall}")), None);
        }
        Some(_) => {}
    }
}

impl Auditor for PasswordPolicyAuditor {
    fn index(&self) -> &'static str {
        tech::PASSWORD_POLICY
    }

    fn name(&self) -> &'static str {
        "PasswordPolicyAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new("check_require_uppercase", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.5",
                    "Password Policy should require uppercase letters.",
                    |p| !p.require_uppercase,
                );
                Ok(())
            }),
            Check::new("check_require_lowercase", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.6",
                    "Password Policy should require lowercase letters.",
                    |p| !p.require_lowercase,
                );
                Ok(())
            }),
            Check::new("check_require_symbols", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.7",
                    "Password Policy should require a symbol.",
                    |p| !p.require_symbols,
                );
                Ok(())
            }),
            Check::new("check_require_numbers", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.8",
                    "Password Policy should require a number.",
                    |p| !p.require_numbers,
                );
                Ok(())
            }),
            Check::new("check_minimum_length", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.9",
                    "Password Policy should require at least 14 characters.",
                    |p| p.minimum_length < 14,
                );
                Ok(())
            }),
            Check::new("check_reuse_prevention", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.10",
                    "Password Policy should prevent password reuse.",
                    |p| p.reuse_prevention != Some(24),
                );
                Ok(())
            }),
            Check::new("check_expiry", |_ctx, item| {
                policy_check(
                    item,
                    "sa-iam-cis-1.11",
                    "Password Policy should expire passwords within 90 days.",
                    |p| !p.expire_passwords || p.max_password_age.unwrap_or(0) > 90,
                );
                Ok(())
            }),
        ]
    }
}
