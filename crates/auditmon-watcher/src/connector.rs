//! The seam between watchers and the cloud provider SDK.
//!
//! A [`Connector`] implementation owns credentials, session/STS
//! handling, and the actual SDK calls; watchers only see typed pages.
//! Every method defaults to an empty result so tests (and partial
//! providers) override just what they need.

use async_trait::async_trait;
use auditmon_common::config::{
    CloudTrailConfig, CredReportConfig, Ec2InstanceConfig, IamUserConfig, InspectorConfig,
    ManagedPolicyConfig, PasswordPolicyConfig, RouteTableConfig, S3Config, SecurityGroupConfig,
};
use chrono::{DateTime, Utc};

/// Provider-side failure surfaced to a watcher.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Session/credential establishment failed for the account.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider rate-limited the call past the SDK's own retries.
    #[error("throttled: {0}")]
    Throttled(String),

    /// Any other API failure (malformed response, service error).
    #[error("api error: {0}")]
    Api(String),
}

/// One page of a paginated listing. A `next_token` of `None` ends the
/// loop; an empty `items` page is valid.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_token: None,
        }
    }
}

type Result<T> = std::result::Result<T, ConnectorError>;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Regions to enumerate for regional technologies.
    async fn list_regions(&self, _account: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_security_groups(
        &self,
        _account: &str,
        _region: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<SecurityGroupConfig>> {
        Ok(Page::default())
    }

    async fn list_iam_users(
        &self,
        _account: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<IamUserConfig>> {
        Ok(Page::default())
    }

    /// Kick off credential-report generation. The report becomes
    /// available asynchronously via [`Connector::fetch_credential_report`].
    async fn generate_credential_report(&self, _account: &str) -> Result<()> {
        Ok(())
    }

    /// `Ok(None)` means the report is still being generated; callers
    /// poll with a bounded retry count.
    async fn fetch_credential_report(
        &self,
        _account: &str,
    ) -> Result<Option<Vec<CredReportConfig>>> {
        Ok(Some(Vec::new()))
    }

    /// `Ok(None)` when the account has no password policy configured.
    async fn get_password_policy(&self, _account: &str) -> Result<Option<PasswordPolicyConfig>> {
        Ok(None)
    }

    async fn list_trails(&self, _account: &str, _region: &str) -> Result<Vec<CloudTrailConfig>> {
        Ok(Vec::new())
    }

    async fn list_buckets(
        &self,
        _account: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<S3Config>> {
        Ok(Page::default())
    }

    async fn list_route_tables(
        &self,
        _account: &str,
        _region: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<RouteTableConfig>> {
        Ok(Page::default())
    }

    /// Names of configuration recorders present in the region. An empty
    /// list means the region records nothing.
    async fn describe_config_recorders(
        &self,
        _account: &str,
        _region: &str,
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_instances(
        &self,
        _account: &str,
        _region: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<Ec2InstanceConfig>> {
        Ok(Page::default())
    }

    async fn list_managed_policies(
        &self,
        _account: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<ManagedPolicyConfig>> {
        Ok(Page::default())
    }

    async fn list_detectors(
        &self,
        _account: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<String>> {
        Ok(Page::default())
    }

    async fn list_finding_ids(
        &self,
        _account: &str,
        _detector_id: &str,
        _next_token: Option<&str>,
    ) -> Result<Page<String>> {
        Ok(Page::default())
    }

    /// Full finding payloads for a batch of ids.
    async fn get_findings(
        &self,
        _account: &str,
        _detector_id: &str,
        _finding_ids: &[String],
    ) -> Result<Vec<serde_json::Value>> {
        Ok(Vec::new())
    }

    async fn list_inspector_findings(
        &self,
        _account: &str,
        _region: &str,
        _begin_date: DateTime<Utc>,
        _next_token: Option<&str>,
    ) -> Result<Page<InspectorConfig>> {
        Ok(Page::default())
    }
}

/// Stand-in connector used when no provider SDK integration is
/// compiled in: every listing is empty, so the connector-backed
/// watchers produce no items while push ingestion and the scanner
/// watcher keep working.
pub struct NullConnector;

#[async_trait]
impl Connector for NullConnector {}

