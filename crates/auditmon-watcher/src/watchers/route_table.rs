use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct RouteTableWatcher {
    connector: Arc<dyn Connector>,
}

impl RouteTableWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for RouteTableWatcher {
    fn index(&self) -> &'static str {
        tech::ROUTE_TABLE
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
                        .list_route_tables(&account.name, region, next_token.as_deref())
                        .await
                    {
                        Ok(page) => page,
                        Err(e) => {
                            result.record_exception(self.index(), &account.name, region, e.into());
                            break;
                        }
                    };

                    for table in page.items {
                        if account.ignores(&table.id) {
                            continue;
                        }
                        let name = table.id.clone();
                        result.items.push(ChangeItem::new(
                            &account.name,
                            region,
                            &name,
                            None,
                            ResourceConfig::RouteTable(table),
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
