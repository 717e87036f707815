//! Shared CloudWatch log-metric-filter matching.
//!
//! A trail is expected to carry a metric filter whose pattern matches
//! every regex in a rule's set, with at least one alarm subscriber.
//! Matching filters without subscribers are the findings; a missing log
//! group is handled by the caller.

use auditmon_common::config::MetricFilter;
use regex::Regex;

/// Metric filters whose pattern matches every regex in `patterns` but
/// have no alarm subscriber.
pub fn matching_filters_without_alarm<'a>(
    filters: &'a [MetricFilter],
    patterns: &[&str],
) -> Vec<&'a MetricFilter> {
    let compiled: Vec<Regex> = patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();
    if compiled.len() != patterns.len() {
        return Vec::new();
    }
    filters
        .iter()
        .filter(|f| compiled.iter().all(|re| re.is_match(&f.pattern)))
        .filter(|f| f.subscribers.is_empty())
        .collect()
}

/// Patterns for unauthorized API call alarms.
pub const UNAUTHORIZED_API_PATTERNS: &[&str] = &[
    r#"\$\.errorCode\s*=\s*"?\*UnauthorizedOperation("|\)|\s)"#,
    r#"\$\.errorCode\s*=\s*"?AccessDenied\*("|\)|\s)"#,
];

/// Patterns for root account usage alarms.
pub const ROOT_USAGE_PATTERNS: &[&str] = &[
    r#"\$\.userIdentity\.type\s*=\s*"?Root"#,
    r#"\$\.userIdentity\.invokedBy\s*NOT\s*EXISTS"#,
    r#"\$\.eventType\s*!=\s*"?AwsServiceEvent("|\)|\s)"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(pattern: &str, subscribers: &[&str]) -> MetricFilter {
        MetricFilter {
            pattern: pattern.to_string(),
            subscribers: subscribers.iter().map(|s| s.to_string()).collect(),
        }
    }

    const ROOT_PATTERN: &str = "{ $.userIdentity.type = \"Root\" && $.userIdentity.invokedBy NOT EXISTS && $.eventType != \"AwsServiceEvent\" }";

    #[test]
    fn test_matching_filter_without_subscriber_is_flagged() {
        let filters = vec![filter(ROOT_PATTERN, &[])];
        let hits = matching_filters_without_alarm(&filters, ROOT_USAGE_PATTERNS);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_subscribed_filter_is_not_flagged() {
        let filters = vec![filter(ROOT_PATTERN, &["arn:aws:sns:us-east-1:1:alarms"])];
        let hits = matching_filters_without_alarm(&filters, ROOT_USAGE_PATTERNS);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_unrelated_filter_is_not_flagged() {
        let filters = vec![filter("{ $.eventName = ConsoleLogin }", &[])];
        let hits = matching_filters_without_alarm(&filters, ROOT_USAGE_PATTERNS);
        assert!(hits.is_empty());
    }
}
