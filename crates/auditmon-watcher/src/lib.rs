//! Watchers: per-technology pollers that normalize cloud resources into
//! [`ChangeItem`]s.
//!
//! A watcher's [`Watcher::slurp`] walks every monitored account (and
//! region, for regional resources), pages through the [`Connector`]
//! until no continuation token remains, and returns the normalized
//! items next to a per-(technology, account, region) exception map.
//! One failing account never blocks visibility into the others.

pub mod connector;
pub mod watchers;

use auditmon_common::types::ChangeItem;
use std::collections::HashMap;
use std::sync::Arc;

pub use connector::{Connector, ConnectorError, Page};

/// A monitored account as the watchers see it: name, provider
/// identifier, and the resource-name glob patterns to skip.
#[derive(Debug, Clone)]
pub struct AccountRef {
    pub name: String,
    pub identifier: String,
    pub ignore_list: Vec<String>,
}

impl AccountRef {
    /// Whether a resource name matches the account's ignore list.
    pub fn ignores(&self, name: &str) -> bool {
        self.ignore_list
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, name))
    }
}

/// Failure observed while slurping one (technology, account, region).
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("provider call failed: {0}")]
    Provider(String),

    #[error("credential report not ready after {attempts} attempts")]
    ReportTimeout { attempts: u32 },
}

impl From<ConnectorError> for WatcherError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Auth(msg) => WatcherError::Connection(msg),
            ConnectorError::Throttled(msg) | ConnectorError::Api(msg) => {
                WatcherError::Provider(msg)
            }
        }
    }
}

/// Exceptions keyed by (technology, account, region).
pub type ExceptionMap = HashMap<(String, String, String), WatcherError>;

/// Output of one slurp pass.
#[derive(Debug, Default)]
pub struct SlurpResult {
    pub items: Vec<ChangeItem>,
    pub exceptions: ExceptionMap,
}

impl SlurpResult {
    /// Record one failure and keep going. The failing key never aborts
    /// the remaining accounts or regions.
    pub fn record_exception(
        &mut self,
        index: &str,
        account: &str,
        region: &str,
        error: WatcherError,
    ) {
        tracing::error!(
            technology = index,
            account = account,
            region = region,
            error = %error,
            "Slurp failed for account/region"
        );
        self.exceptions.insert(
            (index.to_string(), account.to_string(), region.to_string()),
            error,
        );
    }
}

/// One per-technology poller.
#[async_trait::async_trait]
pub trait Watcher: Send + Sync {
    /// Technology index this watcher produces, e.g. `securitygroup`.
    fn index(&self) -> &'static str;

    /// Config paths excluded from change detection because they vary
    /// between polls without security relevance.
    fn ephemeral_paths(&self) -> &'static [&'static str] {
        &[]
    }

    /// Enumerate the current resources of this watcher's technology for
    /// every given account.
    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult;
}

/// The full battery of connector-backed watchers. The scanner watcher is
/// built separately because its endpoints come from the database.
pub fn default_watchers(connector: Arc<dyn Connector>) -> Vec<Arc<dyn Watcher>> {
    vec![
        Arc::new(watchers::security_group::SecurityGroupWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::iam_user::IamUserWatcher::new(connector.clone())),
        Arc::new(watchers::cred_report::CredReportWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::password_policy::PasswordPolicyWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::cloud_trail::CloudTrailWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::s3::S3Watcher::new(connector.clone())),
        Arc::new(watchers::route_table::RouteTableWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::config_recorder::ConfigRecorderWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::ec2_instance::Ec2InstanceWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::managed_policy::ManagedPolicyWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::guardduty::GuardDutyWatcher::new(
            connector.clone(),
        )),
        Arc::new(watchers::inspector::InspectorWatcher::new(connector)),
    ]
}
