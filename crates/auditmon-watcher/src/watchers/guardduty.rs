use crate::{AccountRef, Connector, SlurpResult, Watcher, WatcherError};
use auditmon_common::config::{tech, ResourceConfig, UNIVERSAL_REGION};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct GuardDutyWatcher {
    connector: Arc<dyn Connector>,
}

impl GuardDutyWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    async fn detector_ids(&self, account: &str) -> Result<Vec<String>, WatcherError> {
        let mut ids = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .connector
                .list_detectors(account, next_token.as_deref())
                .await?;
            ids.extend(page.items);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }
        Ok(ids)
    }

    async fn findings(
        &self,
        account: &str,
        detector_id: &str,
    ) -> Result<Vec<serde_json::Value>, WatcherError> {
        let mut findings = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .connector
                .list_finding_ids(account, detector_id, next_token.as_deref())
                .await?;
            if !page.items.is_empty() {
                let batch = self
                    .connector
                    .get_findings(account, detector_id, &page.items)
                    .await?;
                findings.extend(batch);
            }
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }
        Ok(findings)
    }
}

#[async_trait::async_trait]
impl Watcher for GuardDutyWatcher {
    fn index(&self) -> &'static str {
        tech::GUARD_DUTY
    }

    fn ephemeral_paths(&self) -> &'static [&'static str] {
        // Findings re-fire with only these moving between polls.
        &["UpdatedAt", "Service.EventLastSeen", "Service.Count"]
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        'accounts: for account in accounts {
            let detector_ids = match self.detector_ids(&account.name).await {
                Ok(ids) => ids,
                Err(e) => {
                    result.record_exception(self.index(), &account.name, UNIVERSAL_REGION, e);
                    continue;
                }
            };

            for detector_id in &detector_ids {
                tracing::debug!(
                    account = %account.name,
                    detector = %detector_id,
                    "Processing GuardDuty detector"
                );
                let findings = match self.findings(&account.name, detector_id).await {
                    Ok(findings) => findings,
                    Err(e) => {
                        result.record_exception(self.index(), &account.name, UNIVERSAL_REGION, e);
                        continue 'accounts;
                    }
                };

                for finding in findings {
                    let name = finding
                        .get("Title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("guardduty-finding")
                        .to_string();
                    if account.ignores(&name) {
                        continue;
                    }
                    let region = finding
                        .get("Region")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string();
                    let arn = finding
                        .get("Arn")
                        .and_then(|v| v.as_str())
                        .map(String::from);
                    result.items.push(ChangeItem::new(
                        &account.name,
                        &region,
                        &name,
                        arn,
                        ResourceConfig::GuardDuty(finding),
                    ));
                }
            }
        }

        result
    }
}
