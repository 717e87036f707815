use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    identifier TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    third_party INTEGER NOT NULL DEFAULT 0,
    notify_emails TEXT NOT NULL DEFAULT '[]',
    ignore_list TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_accounts_identifier ON accounts(identifier);
CREATE INDEX IF NOT EXISTS idx_accounts_active ON accounts(active);

CREATE TABLE IF NOT EXISTS technologies (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY NOT NULL,
    tech_id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    region TEXT NOT NULL,
    name TEXT NOT NULL,
    arn TEXT,
    latest_revision_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(tech_id, account_id, region, name)
);
CREATE INDEX IF NOT EXISTS idx_items_tech ON items(tech_id);
CREATE INDEX IF NOT EXISTS idx_items_account ON items(account_id);

CREATE TABLE IF NOT EXISTS item_revisions (
    id TEXT PRIMARY KEY NOT NULL,
    item_id TEXT NOT NULL,
    config TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    date_created TEXT NOT NULL,
    date_last_ephemeral_change TEXT
);
CREATE INDEX IF NOT EXISTS idx_revisions_item ON item_revisions(item_id);
CREATE INDEX IF NOT EXISTS idx_revisions_date ON item_revisions(date_created DESC);
CREATE INDEX IF NOT EXISTS idx_revisions_active ON item_revisions(active);

CREATE TABLE IF NOT EXISTS item_audits (
    id TEXT PRIMARY KEY NOT NULL,
    item_id TEXT NOT NULL,
    auditor_setting_id TEXT,
    score INTEGER NOT NULL DEFAULT 0,
    issue TEXT NOT NULL,
    notes TEXT,
    action_instructions TEXT,
    justified INTEGER NOT NULL DEFAULT 0,
    justification TEXT,
    justified_date TEXT,
    fixed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audits_item ON item_audits(item_id);
CREATE INDEX IF NOT EXISTS idx_audits_score ON item_audits(score);
CREATE INDEX IF NOT EXISTS idx_audits_open ON item_audits(justified, fixed);

CREATE TABLE IF NOT EXISTS auditor_settings (
    id TEXT PRIMARY KEY NOT NULL,
    tech_id TEXT NOT NULL,
    account_id TEXT NOT NULL,
    auditor_class TEXT NOT NULL,
    disabled INTEGER NOT NULL DEFAULT 0,
    issue_text TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(tech_id, account_id, auditor_class)
);

CREATE TABLE IF NOT EXISTS guardduty_events (
    id TEXT PRIMARY KEY NOT NULL,
    item_id TEXT NOT NULL,
    config TEXT NOT NULL,
    date_created TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_gd_events_item ON guardduty_events(item_id);

CREATE TABLE IF NOT EXISTS scanner_configs (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    url TEXT NOT NULL,
    ssl_verify INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS watch_state (
    technology TEXT PRIMARY KEY NOT NULL,
    last_run_at TEXT NOT NULL,
    last_item_count INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    updated_at TEXT NOT NULL
);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS watch_state;
DROP TABLE IF EXISTS scanner_configs;
DROP TABLE IF EXISTS guardduty_events;
DROP TABLE IF EXISTS auditor_settings;
DROP TABLE IF EXISTS item_audits;
DROP TABLE IF EXISTS item_revisions;
DROP TABLE IF EXISTS items;
DROP TABLE IF EXISTS technologies;
DROP TABLE IF EXISTS accounts;
";
