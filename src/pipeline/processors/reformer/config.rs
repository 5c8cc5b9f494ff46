use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::expression::SyntaxError;
use super::fields::FieldReformer;
use super::merge::RetentionPolicy;
use super::resolver::{self, EvaluationMode};

/// Flat directives that configure the reformer itself. Every other flat
/// directive is a field template.
const RESERVED_DIRECTIVES: &[&str] = &[
    "tag",
    "output_tag",
    "enable_ruby",
    "enable_expressions",
    "auto_typecast",
    "renew_record",
    "keep_keys",
    "remove_keys",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("'tag' must be specified")]
    MissingTag,

    #[error("keep_keys must be specified together with renew_record true")]
    KeepKeysWithoutRenew,

    #[error("'{key}' must be a boolean (true/false/yes/no), got '{value}'")]
    InvalidBool { key: String, value: String },

    #[error("'{key}' must be a string, number or boolean")]
    InvalidDirective { key: String },

    #[error("invalid template for '{field}' ('{template}'): {source}")]
    InvalidTemplate {
        field: String,
        template: String,
        #[source]
        source: SyntaxError,
    },
}

/// Configuration tree for one reformer: flat directives plus an optional
/// nested `record` block of field templates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReformerDirectives {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub directives: Map<String, Value>,
}

impl ReformerDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directive(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.directives.insert(key.to_string(), value.into());
        self
    }

    pub fn record_field(mut self, key: &str, template: &str) -> Self {
        self.record
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), Value::String(template.to_string()));
        self
    }
}

/// Validated, compiled reformer configuration.
#[derive(Debug)]
pub struct ReformerConfig {
    pub mode: EvaluationMode,
    pub auto_typecast: bool,
    pub policy: RetentionPolicy,
    pub templates: FieldReformer,
}

impl ReformerConfig {
    pub fn from_directives(directives: &ReformerDirectives) -> Result<Self, ConfigError> {
        let flat = directives
            .directives
            .iter()
            .map(|(key, value)| Ok((key.as_str(), scalar(key, value)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let get = |key: &str| flat.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());

        let tag_template = match (get("tag"), get("output_tag")) {
            (Some(tag), _) => tag,
            (None, Some(legacy)) => {
                warn!("'output_tag' is deprecated, use 'tag' instead");
                legacy
            }
            (None, None) => return Err(ConfigError::MissingTag),
        };
        if tag_template.is_empty() {
            return Err(ConfigError::MissingTag);
        }

        let expressions = match get("enable_expressions") {
            Some(value) => parse_bool("enable_expressions", value)?,
            None => get("enable_ruby")
                .map(|value| parse_bool("enable_ruby", value))
                .transpose()?
                .unwrap_or(true),
        };
        let mode = if expressions {
            EvaluationMode::Expression
        } else {
            EvaluationMode::Restricted
        };

        let auto_typecast = get("auto_typecast")
            .map(|value| parse_bool("auto_typecast", value))
            .transpose()?
            .unwrap_or(false);
        let renew_record = get("renew_record")
            .map(|value| parse_bool("renew_record", value))
            .transpose()?
            .unwrap_or(false);

        let keep_keys = get("keep_keys");
        if keep_keys.is_some() && !renew_record {
            return Err(ConfigError::KeepKeysWithoutRenew);
        }

        let policy = RetentionPolicy {
            renew_record,
            keep_keys: keep_keys.map(split_keys).unwrap_or_default(),
            remove_keys: get("remove_keys").map(split_keys).unwrap_or_default(),
        };

        let mut field_templates: Vec<(String, String)> = flat
            .iter()
            .filter(|(key, _)| !RESERVED_DIRECTIVES.contains(key))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        for (key, value) in directives.record.iter().flatten() {
            let template = scalar(key, value)?;
            match field_templates.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = template,
                None => field_templates.push((key.clone(), template)),
            }
        }

        let compile = |field: &str, template: &str| {
            resolver::compile(template, mode, auto_typecast).map_err(|source| {
                ConfigError::InvalidTemplate {
                    field: field.to_string(),
                    template: template.to_string(),
                    source,
                }
            })
        };

        let tag = compile("tag", tag_template)?;
        let fields = field_templates
            .iter()
            .map(|(name, template)| Ok((name.clone(), compile(name, template)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            mode,
            auto_typecast,
            policy,
            templates: FieldReformer::new(tag, fields),
        })
    }
}

fn scalar(key: &str, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ConfigError::InvalidDirective {
            key: key.to_string(),
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Comma separated key list, trimmed and deduplicated in order.
fn split_keys(value: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in value.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_is_required() {
        let err = ReformerConfig::from_directives(&ReformerDirectives::new()).unwrap_err();
        assert_eq!(err, ConfigError::MissingTag);

        let err = ReformerConfig::from_directives(&ReformerDirectives::new().directive("tag", ""))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingTag);
    }

    #[test]
    fn test_output_tag_alias() {
        let config =
            ReformerConfig::from_directives(&ReformerDirectives::new().directive("output_tag", "x.${tag}"))
                .unwrap();
        assert_eq!(config.templates.tag_template(), "x.${tag}");

        let config = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("output_tag", "old")
                .directive("tag", "new"),
        )
        .unwrap();
        assert_eq!(config.templates.tag_template(), "new");
    }

    #[test]
    fn test_keep_keys_requires_renew_record() {
        let err = ReformerConfig::from_directives(
            &ReformerDirectives::new().directive("tag", "t").directive("keep_keys", "a"),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::KeepKeysWithoutRenew);

        let config = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .directive("renew_record", "true")
                .directive("keep_keys", "a, b,,a"),
        )
        .unwrap();
        assert!(config.policy.renew_record);
        assert_eq!(config.policy.keep_keys, vec!["a", "b"]);
    }

    #[test]
    fn test_mode_flags() {
        let config =
            ReformerConfig::from_directives(&ReformerDirectives::new().directive("tag", "t")).unwrap();
        assert_eq!(config.mode, EvaluationMode::Expression);
        assert!(!config.auto_typecast);

        let config = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .directive("enable_ruby", "no")
                .directive("auto_typecast", true),
        )
        .unwrap();
        assert_eq!(config.mode, EvaluationMode::Restricted);
        assert!(config.auto_typecast);

        let err = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .directive("renew_record", "maybe"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
    }

    #[test]
    fn test_field_templates_from_both_forms() {
        let config = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .directive("message", "${message}")
                .directive("hostname", "${hostname}")
                .directive("remove_keys", "a,b")
                .record_field("extra", "1")
                .record_field("message", "from block"),
        )
        .unwrap();

        let names: Vec<&str> = config.templates.field_names().collect();
        assert_eq!(names, vec!["message", "hostname", "extra"]);
        assert_eq!(config.policy.remove_keys, vec!["a", "b"]);
    }

    #[test]
    fn test_no_field_templates_is_legal() {
        let config =
            ReformerConfig::from_directives(&ReformerDirectives::new().directive("tag", "t")).unwrap();
        assert_eq!(config.templates.field_names().count(), 0);
    }

    #[test]
    fn test_invalid_directive_values() {
        let err = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .directive("message", json!(["a"])),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidDirective { key: "message".to_string() });
    }

    #[test]
    fn test_expression_syntax_error_names_field() {
        let err = ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .record_field("broken", "${record['x'}"),
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidTemplate { field, template, .. } => {
                assert_eq!(field, "broken");
                assert_eq!(template, "${record['x'}");
            }
            other => panic!("unexpected error: {other}"),
        }

        // the same text is plain literal data in restricted mode
        assert!(ReformerConfig::from_directives(
            &ReformerDirectives::new()
                .directive("tag", "t")
                .directive("enable_ruby", "no")
                .record_field("broken", "${record['x'}"),
        )
        .is_ok());
    }

    #[test]
    fn test_deserialize_flattened_directives() {
        let directives: ReformerDirectives = serde_json::from_value(json!({
            "tag": "reformed.${tag}",
            "renew_record": true,
            "record": {"hostname": "${hostname}"}
        }))
        .unwrap();

        assert_eq!(directives.directives["tag"], "reformed.${tag}");
        assert_eq!(directives.directives["renew_record"], true);
        assert!(!directives.directives.contains_key("record"));
        assert_eq!(directives.record.unwrap()["hostname"], "${hostname}");
    }
}
