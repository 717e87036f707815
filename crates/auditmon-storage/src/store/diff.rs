//! Structural config comparison with ephemeral-field exclusion.

use serde_json::Value;

/// Remove one dot-separated path (`detail.updatedAt`) from a JSON value.
/// Paths do not descend into arrays.
fn strip_path(value: &mut Value, path: &str) {
    let mut segments = path.split('.').peekable();
    let mut current = value;
    while let Some(segment) = segments.next() {
        let Some(obj) = current.as_object_mut() else {
            return;
        };
        if segments.peek().is_none() {
            obj.remove(segment);
            return;
        }
        match obj.get_mut(segment) {
            Some(next) => current = next,
            None => return,
        }
    }
}

/// Structural equality of two config snapshots, ignoring the watcher's
/// ephemeral field paths.
pub fn configs_equal(a: &Value, b: &Value, ephemeral_paths: &[&str]) -> bool {
    if ephemeral_paths.is_empty() {
        return a == b;
    }
    let mut a = a.clone();
    let mut b = b.clone();
    for path in ephemeral_paths {
        strip_path(&mut a, path);
        strip_path(&mut b, path);
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_without_ephemerals() {
        let a = json!({"a": 1, "b": {"c": 2}});
        let b = json!({"a": 1, "b": {"c": 2}});
        assert!(configs_equal(&a, &b, &[]));
    }

    #[test]
    fn test_ephemeral_difference_is_ignored() {
        let a = json!({"a": 1, "updated_at": "2026-08-06T00:00:00Z"});
        let b = json!({"a": 1, "updated_at": "2026-08-07T00:00:00Z"});
        assert!(!configs_equal(&a, &b, &[]));
        assert!(configs_equal(&a, &b, &["updated_at"]));
    }

    #[test]
    fn test_nested_ephemeral_path() {
        let a = json!({"detail": {"updatedAt": "x", "type": "t"}});
        let b = json!({"detail": {"updatedAt": "y", "type": "t"}});
        assert!(configs_equal(&a, &b, &["detail.updatedAt"]));
        let c = json!({"detail": {"updatedAt": "y", "type": "other"}});
        assert!(!configs_equal(&a, &c, &["detail.updatedAt"]));
    }

    #[test]
    fn test_missing_path_is_harmless() {
        let a = json!({"a": 1});
        let b = json!({"a": 1});
        assert!(configs_equal(&a, &b, &["nope.deep"]));
    }
}
