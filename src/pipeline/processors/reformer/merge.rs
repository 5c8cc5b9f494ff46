use serde_json::Value;

use crate::pipeline::event::Record;

/// What survives from the original record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub renew_record: bool,
    /// Only meaningful with `renew_record`; enforced when the config is loaded.
    pub keep_keys: Vec<String>,
    pub remove_keys: Vec<String>,
}

impl RetentionPolicy {
    /// Combine reformed fields with the original record.
    ///
    /// Fields in `new_fields` overwrite same-named keys in place; new keys
    /// are appended in `new_fields` order. `remove_keys` is applied last.
    pub fn merge(&self, original: &Record, new_fields: Vec<(String, Value)>) -> Record {
        let mut merged = if self.renew_record {
            let mut base = Record::new();
            for key in &self.keep_keys {
                if let Some(value) = original.get(key) {
                    base.insert(key.clone(), value.clone());
                }
            }
            base
        } else {
            original.clone()
        };

        for (key, value) in new_fields {
            merged.insert(key, value);
        }

        for key in &self.remove_keys {
            merged.shift_remove(key);
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn original() -> Record {
        match json!({"eventType0": "bar", "message": "1", "other": true}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn fields(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn keys(record: &Record) -> Vec<&str> {
        record.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_merge_overlays_onto_original() {
        let policy = RetentionPolicy::default();
        let merged = policy.merge(
            &original(),
            fields(&[("message", json!("new")), ("host", json!("h"))]),
        );

        assert_eq!(keys(&merged), vec!["eventType0", "message", "other", "host"]);
        assert_eq!(merged["message"], "new");
        assert_eq!(merged["host"], "h");
    }

    #[test]
    fn test_nil_field_is_kept_as_null() {
        let policy = RetentionPolicy::default();
        let merged = policy.merge(&original(), fields(&[("message", Value::Null)]));
        assert!(merged.contains_key("message"));
        assert!(merged["message"].is_null());
    }

    #[test]
    fn test_renew_without_keep_keys() {
        let policy = RetentionPolicy {
            renew_record: true,
            ..Default::default()
        };
        let merged = policy.merge(&original(), fields(&[("b", json!(1)), ("a", json!(2))]));
        assert_eq!(keys(&merged), vec!["b", "a"]);
    }

    #[test]
    fn test_renew_with_keep_keys() {
        let policy = RetentionPolicy {
            renew_record: true,
            keep_keys: vec!["eventType0".into(), "message".into(), "absent".into()],
            remove_keys: vec![],
        };
        let merged = policy.merge(&original(), fields(&[("message", json!("overwritten"))]));

        assert_eq!(keys(&merged), vec!["eventType0", "message"]);
        assert_eq!(merged["eventType0"], "bar");
        assert_eq!(merged["message"], "overwritten");
    }

    #[test]
    fn test_remove_keys_is_idempotent() {
        let policy = RetentionPolicy {
            remove_keys: vec!["other".into(), "other".into(), "missing".into()],
            ..Default::default()
        };
        let merged = policy.merge(&original(), vec![]);
        assert_eq!(keys(&merged), vec!["eventType0", "message"]);
    }

    #[test]
    fn test_remove_keys_applies_to_new_fields() {
        let policy = RetentionPolicy {
            renew_record: true,
            keep_keys: vec!["message".into()],
            remove_keys: vec!["message".into(), "host".into()],
        };
        let merged = policy.merge(&original(), fields(&[("host", json!("h")), ("x", json!(1))]));
        assert_eq!(keys(&merged), vec!["x"]);
    }
}
