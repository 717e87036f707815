use anyhow::{Context, Result};
use auditmon_notify::{build_daily_summary, ReportMailer};
use auditmon_storage::Store;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};

/// Mails the daily summary to every active account that has recipients
/// configured. One failing account never blocks the others.
pub struct ReportScheduler {
    store: Arc<Store>,
    mailer: Arc<ReportMailer>,
    tick_secs: u64,
    interval_secs: u64,
    days: i64,
}

impl ReportScheduler {
    pub fn new(
        store: Arc<Store>,
        mailer: Arc<ReportMailer>,
        tick_secs: u64,
        interval_secs: u64,
        days: i64,
    ) -> Self {
        Self {
            store,
            mailer,
            tick_secs,
            interval_secs,
            days,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            tick_secs = self.tick_secs,
            interval_secs = self.interval_secs,
            days = self.days,
            "Report scheduler started"
        );

        let mut last_cycle: Option<Instant> = None;
        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            let due = last_cycle
                .map(|t| t.elapsed().as_secs() >= self.interval_secs)
                .unwrap_or(true);
            if !due {
                continue;
            }
            last_cycle = Some(Instant::now());
            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = %e, "Report cycle failed");
            }
        }
    }

    pub async fn run_cycle(&self) -> Result<()> {
        let accounts = self
            .store
            .list_accounts(true)
            .await
            .context("Failed to load accounts for reporting")?;

        for account in accounts {
            if account.notify_emails.is_empty() {
                tracing::debug!(account = %account.name, "No recipients, skipping report");
                continue;
            }
            let summary = match build_daily_summary(&self.store, &account, self.days).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(
                        account = %account.name,
                        error = %e,
                        "Failed to build report, continuing with next account"
                    );
                    continue;
                }
            };
            if let Err(e) = self
                .mailer
                .send(&summary.subject, &summary.html, &account.notify_emails)
                .await
            {
                tracing::error!(
                    account = %account.name,
                    error = %e,
                    "Report delivery failed"
                );
            } else {
                tracing::info!(
                    account = %account.name,
                    recipients = account.notify_emails.len(),
                    "Report sent"
                );
            }
        }
        Ok(())
    }
}
