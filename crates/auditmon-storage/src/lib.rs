//! Persistence layer for items, revisions, and findings.
//!
//! The [`store::Store`] wraps a SeaORM connection (SQLite with WAL mode
//! by default) and owns the diff-and-persist policy: a new revision is
//! appended only when a slurped config differs structurally from the
//! current one, ignoring fields the watcher declared ephemeral.
//! Reporting aggregates run as raw SQL statements over the same
//! connection.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::accounts::AccountRow;
pub use store::guardduty::{CountryCount, IngestOutcome, ProbePoint};
pub use store::items::{StoredItem, TicketSource};
pub use store::reports::{
    masked_identifier, FindingCount, MonthCount, PoamRow, RecentFinding, ReportSection,
    SeverityBuckets, TechCount, GUARDDUTY_REPORT_SCORE, REPORTABLE_SCORE,
};
pub use store::scanners::ScannerConfigRow;
pub use store::watch_state::WatchStateRow;
pub use store::Store;
