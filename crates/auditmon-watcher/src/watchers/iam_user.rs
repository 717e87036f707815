use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig, UNIVERSAL_REGION};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct IamUserWatcher {
    connector: Arc<dyn Connector>,
}

impl IamUserWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for IamUserWatcher {
    fn index(&self) -> &'static str {
        tech::IAM_USER
    }

    fn ephemeral_paths(&self) -> &'static [&'static str] {
        // Login/key usage timestamps move on every poll.
        &["password_last_used"]
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        for account in accounts {
            let mut next_token: Option<String> = None;
            loop {
                let page = match self
                    .connector
                    .list_iam_users(&account.name, next_token.as_deref())
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

                for user in page.items {
                    if account.ignores(&user.user_name) {
                        continue;
                    }
                    let name = user.user_name.clone();
                    let arn = user.arn.clone();
                    result.items.push(ChangeItem::new(
                        &account.name,
                        UNIVERSAL_REGION,
                        &name,
                        Some(arn),
                        ResourceConfig::IamUser(user),
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
