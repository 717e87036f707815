use anyhow::{Context, Result};
use auditmon_audit::{AuditRunner, SupportIndex};
use auditmon_storage::Store;
use auditmon_watcher::watchers::scanner::{ScannerEndpoint, ScannerWatcher};
use auditmon_watcher::{default_watchers, AccountRef, Connector, Watcher};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};

/// Runs the slurp -> store -> audit -> reconcile cycle.
///
/// Watchers iterate accounts and regions sequentially; one cycle runs
/// at a time. Every item is persisted through the diff policy before
/// the audit pass, so a crash mid-cycle leaves a consistent prefix and
/// the next cycle no-ops the unchanged items.
pub struct WatchScheduler {
    store: Arc<Store>,
    connector: Arc<dyn Connector>,
    tick_secs: u64,
    interval_secs: u64,
}

impl WatchScheduler {
    pub fn new(
        store: Arc<Store>,
        connector: Arc<dyn Connector>,
        tick_secs: u64,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            connector,
            tick_secs,
            interval_secs,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            tick_secs = self.tick_secs,
            interval_secs = self.interval_secs,
            "Watch scheduler started"
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
                tracing::error!(error = %e, "Watch cycle failed");
            }
        }
    }

    /// All watchers for this cycle: the connector-backed battery plus
    /// one scanner watcher per configured endpoint set.
    async fn build_watchers(&self) -> Result<Vec<Arc<dyn Watcher>>> {
        let mut watchers = default_watchers(self.connector.clone());
        let scanner_rows = self
            .store
            .list_scanner_configs()
            .await
            .context("Failed to load scanner configs")?;
        if !scanner_rows.is_empty() {
            let endpoints: Vec<ScannerEndpoint> = scanner_rows
                .into_iter()
                .map(|row| ScannerEndpoint {
                    name: row.name,
                    username: row.username,
                    password: row.password,
                    url: row.url,
                    ssl_verify: row.ssl_verify,
                })
                .collect();
            watchers.push(Arc::new(ScannerWatcher::new(endpoints)));
        }
        Ok(watchers)
    }

    pub async fn run_cycle(&self) -> Result<()> {
        let account_rows = self
            .store
            .list_accounts(true)
            .await
            .context("Failed to load accounts")?;
        if account_rows.is_empty() {
            tracing::debug!("No active accounts, skipping watch cycle");
            return Ok(());
        }
        let accounts: Vec<AccountRef> = account_rows
            .iter()
            .map(|a| AccountRef {
                name: a.name.clone(),
                identifier: a.identifier.clone(),
                ignore_list: a.ignore_list.clone(),
            })
            .collect();

        let watchers = self.build_watchers().await?;

        let mut items = Vec::new();
        let mut stored = Vec::new();
        for watcher in &watchers {
            let started = Utc::now();
            let result = watcher.slurp(&accounts).await;
            let item_count = result.items.len();
            let exception_count = result.exceptions.len();
            let first_error = result.exceptions.values().next().map(|e| e.to_string());

            for item in result.items {
                match self
                    .store
                    .store_change_item(&item, watcher.ephemeral_paths())
                    .await
                {
                    Ok(outcome) => {
                        items.push(item);
                        stored.push(outcome);
                    }
                    Err(e) => {
                        tracing::error!(
                            technology = watcher.index(),
                            item = %item.name,
                            account = %item.account,
                            error = %e,
                            "Failed to store slurped item"
                        );
                    }
                }
            }

            if let Err(e) = self
                .store
                .upsert_watch_state(
                    watcher.index(),
                    started,
                    item_count as i32,
                    first_error.as_deref(),
                )
                .await
            {
                tracing::error!(
                    technology = watcher.index(),
                    error = %e,
                    "Failed to update watch state"
                );
            }

            tracing::info!(
                technology = watcher.index(),
                items = item_count,
                exceptions = exception_count,
                "Watcher slurp finished"
            );
        }

        // Cross-item checks read the same cycle's items, indexed by
        // (technology, account).
        let support = SupportIndex::from_items(&items);
        let mut runner = AuditRunner::default_battery();
        runner.audit(&mut items, &support);

        let mut inserted_total = 0usize;
        let mut fixed_total = 0usize;
        for (item, outcome) in items.iter().zip(&stored) {
            match self
                .store
                .reconcile_issues(
                    &outcome.item_id,
                    &outcome.tech_id,
                    &outcome.account_id,
                    &item.issues,
                )
                .await
            {
                Ok((inserted, fixed)) => {
                    inserted_total += inserted;
                    fixed_total += fixed;
                }
                Err(e) => {
                    tracing::error!(
                        item = %item.name,
                        account = %item.account,
                        error = %e,
                        "Failed to reconcile issues"
                    );
                }
            }
        }

        tracing::info!(
            items = items.len(),
            new_issues = inserted_total,
            fixed_issues = fixed_total,
            "Watch cycle finished"
        );
        Ok(())
    }
}
