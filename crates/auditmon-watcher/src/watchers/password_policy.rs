use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig, UNIVERSAL_REGION};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct PasswordPolicyWatcher {
    connector: Arc<dyn Connector>,
}

impl PasswordPolicyWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for PasswordPolicyWatcher {
    fn index(&self) -> &'static str {
        tech::PASSWORD_POLICY
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        for account in accounts {
            // A missing policy is a finding, not an error: the item is
            // emitted with an absent config so the auditor can score it.
            match self.connector.get_password_policy(&account.name).await {
                Ok(policy) => {
                    result.items.push(ChangeItem::new(
                        &account.name,
                        UNIVERSAL_REGION,
                        "",
                        None,
                        ResourceConfig::PasswordPolicy(policy),
                    ));
                }
                Err(e) => {
                    result.record_exception(
                        self.index(),
                        &account.name,
                        UNIVERSAL_REGION,
                        e.into(),
                    );
                }
            }
        }

        result
    }
}
