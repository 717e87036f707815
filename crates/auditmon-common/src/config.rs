//! Typed per-technology resource configurations.
//!
//! Each watcher normalizes provider responses into one of these structs;
//! the storage layer serializes them to an opaque JSON column, and the
//! audit checks read them back as plain Rust fields instead of poking at
//! untyped maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Technology index names. Watchers, auditors, and items agree on these.
pub mod tech {
    pub const SECURITY_GROUP: &str = "securitygroup";
    pub const IAM_USER: &str = "iamuser";
    pub const CRED_REPORT: &str = "credreport";
    pub const PASSWORD_POLICY: &str = "passwordpolicy";
    pub const CLOUD_TRAIL: &str = "cloudtrail";
    pub const S3: &str = "s3";
    pub const ROUTE_TABLE: &str = "routetable";
    pub const CONFIG_RECORDER: &str = "configrecorder";
    pub const EC2_INSTANCE: &str = "ec2instance";
    pub const MANAGED_POLICY: &str = "managedpolicy";
    pub const GUARD_DUTY: &str = "guardduty";
    pub const INSPECTOR: &str = "inspector";
    pub const SCANNER: &str = "scanner";
}

/// Region name used for resources that are not tied to any region.
pub const UNIVERSAL_REGION: &str = "universal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    /// `ingress` or `egress`.
    pub rule_type: String,
    /// Protocol number or name; `-1` means all protocols (and all ports).
    pub ip_protocol: String,
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    pub cidr_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupConfig {
    pub id: String,
    pub name: String,
    pub vpc_id: Option<String>,
    pub rules: Vec<SecurityGroupRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessKey {
    pub access_key_id: String,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub last_used_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamUserConfig {
    pub arn: String,
    pub user_name: String,
    pub create_date: Option<DateTime<Utc>>,
    pub password_last_used: Option<DateTime<Utc>>,
    pub access_keys: Vec<AccessKey>,
}

impl IamUserConfig {
    /// Whether the ARN names the account root (`arn:aws:iam::123:root`).
    pub fn is_root(&self) -> bool {
        self.arn.rsplit(':').next() == Some("root")
    }
}

/// One row of the IAM credential report CSV, normalized by the watcher.
/// `N/A` / `no_information` dates arrive here as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredReportConfig {
    pub user: String,
    pub arn: String,
    pub password_enabled: bool,
    pub password_last_used: Option<DateTime<Utc>>,
    pub access_key_1_active: bool,
    pub access_key_1_last_used: Option<DateTime<Utc>>,
    pub access_key_2_active: bool,
    pub access_key_2_last_used: Option<DateTime<Utc>>,
    pub mfa_active: bool,
}

impl CredReportConfig {
    pub fn is_root(&self) -> bool {
        self.arn.rsplit(':').next() == Some("root")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordPolicyConfig {
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_symbols: bool,
    pub require_numbers: bool,
    pub minimum_length: i64,
    pub reuse_prevention: Option<i64>,
    pub expire_passwords: bool,
    pub max_password_age: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFilter {
    pub pattern: String,
    pub subscribers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudTrailConfig {
    pub name: String,
    pub is_multi_region_trail: bool,
    /// Whether the trail is currently logging.
    pub trail_status: bool,
    pub cloudwatch_logs_log_group_arn: Option<String>,
    pub kms_key_id: Option<String>,
    pub s3_bucket_name: Option<String>,
    pub metric_filters: Vec<MetricFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket_name: String,
    /// Canonical ID of the owning account.
    pub owner_id: String,
    /// Grantee (canonical ID or group URI) -> granted permissions.
    pub grants: BTreeMap<String, Vec<String>>,
    pub logging_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub destination_cidr_block: Option<String>,
    pub gateway_id: Option<String>,
    pub vpc_peering_connection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTableConfig {
    pub id: String,
    pub vpc_id: Option<String>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecorderConfig {
    pub region: String,
    /// False when the region has no configuration recorder at all.
    pub recorder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ec2InstanceConfig {
    pub instance_id: String,
    pub iam_instance_profile: Option<String>,
    pub public_ip: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedPolicyConfig {
    pub arn: String,
    pub name: String,
    pub attached_users: Vec<String>,
    pub attached_groups: Vec<String>,
    pub attached_roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorConfig {
    pub arn: String,
    pub title: String,
    pub description: Option<String>,
    pub recommendation: Option<String>,
    pub numeric_severity: f64,
    /// Provider-side timestamps; volatile between polls.
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanVuln {
    pub package: String,
    pub fix: Option<String>,
    pub vuln_id: String,
    pub severity: String,
    pub information: Option<String>,
}

/// One scanned package inside a container image, with every vulnerability
/// reported against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub aws_account_id: String,
    pub repo_name: String,
    pub repo_tag: String,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub package: String,
    pub vulns: Vec<ScanVuln>,
}

/// The configuration payload of one monitored resource, keyed by
/// technology. Serialized as a plain object (no tag) so the stored JSON
/// matches what the provider-facing shape looks like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceConfig {
    SecurityGroup(SecurityGroupConfig),
    IamUser(IamUserConfig),
    CredReport(CredReportConfig),
    /// `None` when the account has no password policy configured.
    PasswordPolicy(Option<PasswordPolicyConfig>),
    CloudTrail(CloudTrailConfig),
    S3(S3Config),
    RouteTable(RouteTableConfig),
    ConfigRecorder(ConfigRecorderConfig),
    Ec2Instance(Ec2InstanceConfig),
    ManagedPolicy(ManagedPolicyConfig),
    /// Raw GuardDuty finding payload; provider-specific and not subject
    /// to the generic diff policy.
    GuardDuty(serde_json::Value),
    Inspector(InspectorConfig),
    Scan(ScanConfig),
}

impl ResourceConfig {
    pub fn technology(&self) -> &'static str {
        match self {
            ResourceConfig::SecurityGroup(_) => tech::SECURITY_GROUP,
            ResourceConfig::IamUser(_) => tech::IAM_USER,
            ResourceConfig::CredReport(_) => tech::CRED_REPORT,
            ResourceConfig::PasswordPolicy(_) => tech::PASSWORD_POLICY,
            ResourceConfig::CloudTrail(_) => tech::CLOUD_TRAIL,
            ResourceConfig::S3(_) => tech::S3,
            ResourceConfig::RouteTable(_) => tech::ROUTE_TABLE,
            ResourceConfig::ConfigRecorder(_) => tech::CONFIG_RECORDER,
            ResourceConfig::Ec2Instance(_) => tech::EC2_INSTANCE,
            ResourceConfig::ManagedPolicy(_) => tech::MANAGED_POLICY,
            ResourceConfig::GuardDuty(_) => tech::GUARD_DUTY,
            ResourceConfig::Inspector(_) => tech::INSPECTOR,
            ResourceConfig::Scan(_) => tech::SCANNER,
        }
    }

    /// The config as a JSON value, as persisted in an item revision.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
