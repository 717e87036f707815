use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct CloudTrailWatcher {
    connector: Arc<dyn Connector>,
}

impl CloudTrailWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for CloudTrailWatcher {
    fn index(&self) -> &'static str {
        tech::CLOUD_TRAIL
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
                let trails = match self.connector.list_trails(&account.name, region).await {
                    Ok(trails) => trails,
                    Err(e) => {
                        result.record_exception(self.index(), &account.name, region, e.into());
                        continue;
                    }
                };

                for trail in trails {
                    if account.ignores(&trail.name) {
                        continue;
                    }
                    let name = trail.name.clone();
                    let arn = format!(
                        "arn:aws:cloudtrail:{}:{}:trail/{}",
                        region, account.identifier, name
                    );
                    result.items.push(ChangeItem::new(
                        &account.name,
                        region,
                        &name,
                        Some(arn),
                        ResourceConfig::CloudTrail(trail),
                    ));
                }
            }
        }

        result
    }
}
