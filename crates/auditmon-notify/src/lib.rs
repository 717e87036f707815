//! Daily summary report rendering and delivery.
//!
//! The report aggregates an account's open findings (top issues, top
//! technologies, recent findings, recently justified/fixed findings)
//! into an HTML summary and mails it over SMTP. Delivery failures are
//! retried three times with backoff, then logged and dropped; they
//! never crash the report scheduler.

pub mod mailer;
pub mod report;

pub use mailer::ReportMailer;
pub use report::{build_daily_summary, DailySummary};
