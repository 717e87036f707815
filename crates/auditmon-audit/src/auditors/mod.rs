pub mod cloud_trail;
pub mod config_recorder;
pub mod cred_report;
pub mod ec2_instance;
pub mod guardduty;
pub mod iam_user;
pub mod inspector;
pub mod managed_policy;
pub mod metric_filters;
pub mod password_policy;
pub mod route_table;
pub mod scanner;
pub mod security_group;

/// Issue title used by the informational CIS checks; the specifics live
/// in the notes.
pub const INFORMATIONAL: &str = "Informational";
