use crate::{AccountRef, Connector, SlurpResult, Watcher, WatcherError};
use auditmon_common::config::{tech, ResourceConfig, UNIVERSAL_REGION};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;
use std::time::Duration;

/// Credential reports are generated asynchronously on the provider
/// side: the watcher triggers generation, then polls with a bounded
/// retry count and a fixed sleep. Exhausting the retries is recorded as
/// an exception for that account, never a fatal error.
pub struct CredReportWatcher {
    connector: Arc<dyn Connector>,
    max_poll_attempts: u32,
    poll_interval: Duration,
}

impl CredReportWatcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            max_poll_attempts: 8,
            poll_interval: Duration::from_secs(3),
        }
    }

    pub fn with_polling(mut self, max_poll_attempts: u32, poll_interval: Duration) -> Self {
        self.max_poll_attempts = max_poll_attempts;
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait::async_trait]
impl Watcher for CredReportWatcher {
    fn index(&self) -> &'static str {
        tech::CRED_REPORT
    }

    fn ephemeral_paths(&self) -> &'static [&'static str] {
        &[
            "password_last_used",
            "access_key_1_last_used",
            "access_key_2_last_used",
        ]
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        'accounts: for account in accounts {
            if let Err(e) = self.connector.generate_credential_report(&account.name).await {
                result.record_exception(self.index(), &account.name, UNIVERSAL_REGION, e.into());
                continue;
            }

            let mut report = None;
            for attempt in 0..self.max_poll_attempts {
                match self.connector.fetch_credential_report(&account.name).await {
                    Ok(Some(rows)) => {
                        report = Some(rows);
                        break;
                    }
                    Ok(None) => {
                        tracing::debug!(
                            account = %account.name,
                            attempt = attempt + 1,
                            "Credential report not ready, retrying"
                        );
                        tokio::time::sleep(self.poll_interval).await;
                    }
                    Err(e) => {
                        result.record_exception(
                            self.index(),
                            &account.name,
                            UNIVERSAL_REGION,
                            e.into(),
                        );
                        continue 'accounts;
                    }
                }
            }

            let Some(rows) = report else {
                result.record_exception(
                    self.index(),
                    &account.name,
                    UNIVERSAL_REGION,
                    WatcherError::ReportTimeout {
                        attempts: self.max_poll_attempts,
                    },
                );
                continue;
            };

            for row in rows {
                if account.ignores(&row.user) {
                    continue;
                }
                let name = row.user.clone();
                result.items.push(ChangeItem::new(
                    &account.name,
                    UNIVERSAL_REGION,
                    &name,
                    Some(row.arn.clone()),
                    ResourceConfig::CredReport(row),
                ));
            }
        }

        result
    }
}
