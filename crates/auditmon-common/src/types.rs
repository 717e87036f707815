use crate::config::ResourceConfig;
use serde::{Deserialize, Serialize};

/// Severity band of a finding score, ordered from lowest to highest.
///
/// The banding is canonical across the codebase: scores below 5 are Low,
/// 5 through 10 inclusive are Medium, anything above 10 is High.
///
/// # Examples
///
/// ```
/// use auditmon_common::types::Severity;
///
/// assert_eq!(Severity::band(1), Severity::Low);
/// assert_eq!(Severity::band(10), Severity::Medium);
/// assert_eq!(Severity::band(11), Severity::High);
/// assert!(Severity::High > Severity::Low);
/// let sev: Severity = "medium".parse().unwrap();
/// assert_eq!(sev.to_string(), "medium");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn band(score: i32) -> Self {
        if score > 10 {
            Severity::High
        } else if score >= 5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// A finding raised by an audit check, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDraft {
    /// Non-negative severity weight; higher is worse.
    pub score: i32,
    /// Short issue title / category.
    pub issue: String,
    pub notes: Option<String>,
    pub action_instructions: Option<String>,
    /// Name of the auditor that raised this issue. Filled in by the audit
    /// runner, not by individual checks.
    pub auditor_class: Option<String>,
}

/// One normalized snapshot of a monitored cloud resource, as produced by
/// a watcher. Auditors append issues to it; the storage layer diffs its
/// config against the latest stored revision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeItem {
    /// Technology index, e.g. `securitygroup`.
    pub index: String,
    /// Monitored account name (not the provider identifier).
    pub account: String,
    /// Region, or `universal` for global resources.
    pub region: String,
    /// Human-readable resource name.
    pub name: String,
    pub arn: Option<String>,
    pub config: ResourceConfig,
    /// Issues raised against this snapshot during the current audit pass.
    pub issues: Vec<IssueDraft>,
}

impl ChangeItem {
    pub fn new(
        account: &str,
        region: &str,
        name: &str,
        arn: Option<String>,
        config: ResourceConfig,
    ) -> Self {
        Self {
            index: config.technology().to_string(),
            account: account.to_string(),
            region: region.to_string(),
            name: name.to_string(),
            arn,
            config,
            issues: Vec::new(),
        }
    }

    /// Append one issue to this item. No dedup happens here; a check may
    /// add several issues to the same item.
    pub fn add_issue(
        &mut self,
        score: i32,
        issue: impl Into<String>,
        notes: Option<String>,
        action_instructions: Option<String>,
    ) {
        self.issues.push(IssueDraft {
            score,
            issue: issue.into(),
            notes,
            action_instructions,
            auditor_class: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigRecorderConfig, ResourceConfig};

    #[test]
    fn test_severity_banding_edges() {
        assert_eq!(Severity::band(0), Severity::Low);
        assert_eq!(Severity::band(4), Severity::Low);
        assert_eq!(Severity::band(5), Severity::Medium);
        assert_eq!(Severity::band(10), Severity::Medium);
        assert_eq!(Severity::band(11), Severity::High);
    }

    #[test]
    fn test_change_item_index_follows_config() {
        let item = ChangeItem::new(
            "prod",
            "us-east-1",
            "",
            None,
            ResourceConfig::ConfigRecorder(ConfigRecorderConfig {
                region: "us-east-1".to_string(),
                recorder: false,
            }),
        );
        assert_eq!(item.index, "configrecorder");
        assert!(item.issues.is_empty());
    }
}
