use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ConfigRecorderConfig, ResourceConfig};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

/// Reports regions that have no configuration recorder at all. Regions
/// with a recorder produce no item; absence is the finding.
pub struct ConfigRecorderWatcher {
    connector: Arc<dyn Connector>,
}

impl ConfigRecorderWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for ConfigRecorderWatcher {
    fn index(&self) -> &'static str {
        tech::CONFIG_RECORDER
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
                match self
                    .connector
                    .describe_config_recorders(&account.name, region)
                    .await
                {
                    Ok(recorders) if recorders.is_empty() => {
                        result.items.push(ChangeItem::new(
                            &account.name,
                            region,
                            "",
                            None,
                            ResourceConfig::ConfigRecorder(ConfigRecorderConfig {
                                region: region.clone(),
                                recorder: false,
                            }),
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        result.record_exception(self.index(), &account.name, region, e.into());
                    }
                }
            }
        }

        result
    }
}
