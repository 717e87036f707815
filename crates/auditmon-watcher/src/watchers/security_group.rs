use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct SecurityGroupWatcher {
    connector: Arc<dyn Connector>,
}

impl SecurityGroupWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for SecurityGroupWatcher {
    fn index(&self) -> &'static str {
        tech::SECURITY_GROUP
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        for account in accounts {
            let regions = match self.connector.list_regions(&account.name).await {
                Ok(regions) => regions,
                Err(e) => {
                    result.record_exception(self.index(), &account.name, "universal", e.into());
                    continue;
                }
            };

            for region in &regions {
                let mut next_token: Option<String> = None;
                loop {
                    let page = match self
                        .connector
                        .list_security_groups(&account.name, region, next_token.as_deref())
                        .await
                    {
                        Ok(page) => page,
                        Err(e) => {
                            result.record_exception(self.index(), &account.name, region, e.into());
                            break;
                        }
                    };

                    for sg in page.items {
                        if account.ignores(&sg.name) {
                            continue;
                        }
                        let arn = format!(
                            "arn:aws:ec2:{}:{}:security-group/{}",
                            region, account.identifier, sg.id
                        );
                        let name = sg.name.clone();
                        result.items.push(ChangeItem::new(
                            &account.name,
                            region,
                            &name,
                            Some(arn),
                            ResourceConfig::SecurityGroup(sg),
                        ));
                    }

                    next_token = page.next_token;
                    if next_token.is_none() {
                        break;
                    }
                }
            }
        }

        result
    }
}
