use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct Ec2InstanceWatcher {
    connector: Arc<dyn Connector>,
}

impl Ec2InstanceWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for Ec2InstanceWatcher {
    fn index(&self) -> &'static str {
        tech::EC2_INSTANCE
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
                        .list_instances(&account.name, region, next_token.as_deref())
                        .await
                    {
                        Ok(page) => page,
                        Err(e) => {
                            result.record_exception(self.index(), &account.name, region, e.into());
                            break;
                        }
                    };

                    for instance in page.items {
                        // Prefer the Name tag, fall back to the instance id.
                        let name = instance
                            .tags
                            .get("Name")
                            .cloned()
                            .unwrap_or_else(|| instance.instance_id.clone());
                        if account.ignores(&name) {
                            continue;
                        }
                        let arn = format!(
                            "arn:aws:ec2:{}:{}:instance/{}",
                            region, account.identifier, instance.instance_id
                        );
                        result.items.push(ChangeItem::new(
                            &account.name,
                            region,
                            &name,
                            Some(arn),
                            ResourceConfig::Ec2Instance(instance),
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
