use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod accounts;
pub mod diff;
pub mod guardduty;
pub mod items;
pub mod reports;
pub mod scanners;
pub mod watch_state;

/// Unified access layer over the auditmon database.
///
/// All methods are `async fn` backed by SeaORM. SQLite is the default
/// backend (`sqlite://data/auditmon.db?mode=rwc`); the reporting
/// aggregates run as raw SQL statements and are backend-portable except
/// for the month bucketing, which uses `strftime`.
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connect and initialize the database.
    ///
    /// Runs all pending `sea-orm-migration` migrations so the schema is
    /// current. WAL mode is enabled for SQLite only.
    pub async fn new(db_url: &str) -> Result<Self> {
        let mut options = sea_orm::ConnectOptions::new(db_url.to_string());
        if db_url.contains(":memory:") {
            // An in-memory SQLite database exists per connection; the
            // pool must not hand out a second one.
            options.max_connections(1);
        }
        let db = Database::connect(options).await?;

        if db_url.starts_with("sqlite:") && !db_url.contains(":memory:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized store");

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
