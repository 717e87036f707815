use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig, UNIVERSAL_REGION};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct ManagedPolicyWatcher {
    connector: Arc<dyn Connector>,
}

impl ManagedPolicyWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for ManagedPolicyWatcher {
    fn index(&self) -> &'static str {
        tech::MANAGED_POLICY
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        for account in accounts {
            let mut next_token: Option<String> = None;
            loop {
                let page = match self
                    .connector
                    .list_managed_policies(&account.name, next_token.as_deref())
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        result.record_exception(
                            self.index(),
                            &account.name,
                            UNIVERSAL_REGION,
                            e.into(),
                        );
                        break;
                    }
                };

                for policy in page.items {
                    if account.ignores(&policy.name) {
                        continue;
                    }
                    let name = policy.name.clone();
                    let arn = policy.arn.clone();
                    result.items.push(ChangeItem::new(
                        &account.name,
                        UNIVERSAL_REGION,
                        &name,
                        Some(arn),
                        ResourceConfig::ManagedPolicy(policy),
                    ));
                }

                next_token = page.next_token;
                if next_token.is_none() {
                    break;
                }
            }
        }

        result
    }
}
