use crate::config::{AccountsSeedFile, ServerConfig};
use anyhow::Result;
use auditmon_common::id::next_id;
use auditmon_storage::{AccountRow, Store};
use chrono::Utc;
use std::collections::HashSet;

/// Initialize monitored accounts from a JSON seed file. Existing
/// account names are skipped, never overwritten.
pub async fn run_init_accounts(config_path: &str, seed_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = Store::new(&config.database.url).await?;

    let seed_content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: AccountsSeedFile = serde_json::from_str(&seed_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;

    let existing = store.list_accounts(false).await?;
    let existing_names: HashSet<String> = existing.into_iter().map(|a| a.name).collect();

    let mut created = 0u32;
    let mut skipped = 0u32;

    for account in &seed.accounts {
        if existing_names.contains(&account.name) {
            tracing::warn!(name = %account.name, "Account already exists, skipping");
            skipped += 1;
            continue;
        }
        let row = AccountRow {
            id: next_id(),
            name: account.name.clone(),
            identifier: account.identifier.clone(),
            active: account.active,
            third_party: account.third_party,
            notify_emails: account.notify_emails.clone(),
            ignore_list: account.ignore_list.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        match store.insert_account(&row).await {
            Ok(inserted) => {
                tracing::info!(name = %account.name, id = %inserted.id, "Account created");
                created += 1;
            }
            Err(e) => {
                tracing::error!(name = %account.name, error = %e, "Failed to create account");
            }
        }
    }

    tracing::info!(created, skipped, "init-accounts completed");
    Ok(())
}
