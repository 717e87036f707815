use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Findings older than this are not slurped.
const FINDING_WINDOW_DAYS: i64 = 90;

pub struct InspectorWatcher {
    connector: Arc<dyn Connector>,
}

impl InspectorWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for InspectorWatcher {
    fn index(&self) -> &'static str {
        tech::INSPECTOR
    }

    fn ephemeral_paths(&self) -> &'static [&'static str] {
        &["updated_at"]
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();
        let begin_date = Utc::now() - Duration::days(FINDING_WINDOW_DAYS);

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
                        .list_inspector_findings(
                            &account.name,
                            region,
                            begin_date,
                            next_token.as_deref(),
                        )
                        .await
                    {
                        Ok(page) => page,
                        Err(e) => {
                            result.record_exception(self.index(), &account.name, region, e.into());
                            break;
                        }
                    };

                    for finding in page.items {
                        let name = finding.title.clone();
                        if account.ignores(&name) {
                            continue;
                        }
                        let arn = finding.arn.clone();
                        result.items.push(ChangeItem::new(
                            &account.name,
                            region,
                            &name,
                            Some(arn),
                            ResourceConfig::Inspector(finding),
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
