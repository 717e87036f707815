pub mod account;
pub mod auditor_settings;
pub mod guardduty_event;
pub mod item;
pub mod item_audit;
pub mod item_revision;
pub mod scanner_config;
pub mod technology;
pub mod watch_state;
