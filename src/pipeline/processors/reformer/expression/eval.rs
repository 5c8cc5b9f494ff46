use serde_json::{json, Value};

use super::Expr;
use crate::pipeline::event::Record;
use crate::pipeline::processors::reformer::context::PlaceholderContext;
use crate::pipeline::processors::reformer::resolver::string_form;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("undefined name '{0}'")]
    UnknownName(String),

    #[error("undefined method '{0}' for nil")]
    NilNavigation(String),

    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("cannot index {target} with {index}")]
    UnsupportedIndex {
        target: &'static str,
        index: &'static str,
    },

    #[error("undefined method '{method}' for {kind}")]
    UnknownMethod { method: String, kind: &'static str },

    #[error("undefined function '{0}'")]
    UnknownFunction(String),

    #[error("wrong number of arguments for '{name}' (given {given}, expected {expected})")]
    WrongArity {
        name: String,
        given: usize,
        expected: usize,
    },

    #[error("'{name}' expects {expected} argument, got {given}")]
    InvalidArgument {
        name: String,
        expected: &'static str,
        given: &'static str,
    },
}

/// Names visible to an expression: the placeholder context and the
/// original record.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a, 'c> {
    pub context: &'a PlaceholderContext<'c>,
    pub record: &'a Record,
}

impl<'a, 'c> Scope<'a, 'c> {
    pub fn new(context: &'a PlaceholderContext<'c>, record: &'a Record) -> Self {
        Self { context, record }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        let ctx = self.context;
        let value = match name {
            "tag" => Value::String(ctx.tag().to_string()),
            "tag_parts" => json!(ctx.tag_parts()),
            "tag_prefix" => json!(ctx.tag_prefixes()),
            "tag_suffix" => json!(ctx.tag_suffixes()),
            "time" => Value::String(ctx.formatted_time()),
            "hostname" => Value::String(ctx.hostname().to_string()),
            "record" => Value::Object(self.record.clone()),
            _ => {
                return self
                    .record
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnknownName(name.to_string()))
            }
        };
        Ok(value)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Evaluate a parsed expression against a scope.
pub fn evaluate(expr: &Expr, scope: &Scope<'_, '_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Name(name) => scope.lookup(name),
        Expr::Int(n) => Ok(json!(n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Call { name, args } => call(name, args, scope),
        Expr::Member { target, name, args } => {
            let target = evaluate(target, scope)?;
            member(target, name, args, scope)
        }
        Expr::Index { target, index } => {
            let target = evaluate(target, scope)?;
            let index = evaluate(index, scope)?;
            index_into(target, &index)
        }
    }
}

fn call(name: &str, args: &[Expr], scope: &Scope<'_, '_>) -> Result<Value, EvalError> {
    match name {
        "tag_prefix" | "tag_suffix" => {
            if args.len() != 1 {
                return Err(EvalError::WrongArity {
                    name: name.to_string(),
                    given: args.len(),
                    expected: 1,
                });
            }
            let arg = evaluate(&args[0], scope)?;
            let n = arg.as_i64().ok_or_else(|| EvalError::InvalidArgument {
                name: name.to_string(),
                expected: "an integer",
                given: kind(&arg),
            })?;
            let joined = if name == "tag_prefix" {
                scope.context.tag_prefix(n)
            } else {
                scope.context.tag_suffix(n)
            };
            Ok(Value::String(joined))
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn member(
    target: Value,
    name: &str,
    args: &[Expr],
    scope: &Scope<'_, '_>,
) -> Result<Value, EvalError> {
    if target.is_null() {
        return Err(EvalError::NilNavigation(name.to_string()));
    }

    if args.is_empty() {
        if let Value::Object(map) = &target {
            if let Some(value) = map.get(name) {
                return Ok(value.clone());
            }
        }
    } else {
        // builtin methods take no arguments; evaluate them anyway so that
        // errors inside the arguments are reported first
        for arg in args {
            evaluate(arg, scope)?;
        }
        return Err(EvalError::WrongArity {
            name: name.to_string(),
            given: args.len(),
            expected: 0,
        });
    }

    let result = match (name, &target) {
        ("to_s", value) => Value::String(string_form(value)),
        ("first", Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
        ("last", Value::Array(items)) => items.last().cloned().unwrap_or(Value::Null),
        ("size" | "length", Value::Array(items)) => json!(items.len()),
        ("size" | "length", Value::String(s)) => json!(s.chars().count()),
        ("size" | "length", Value::Object(map)) => json!(map.len()),
        ("keys", Value::Object(map)) => json!(map.keys().collect::<Vec<_>>()),
        ("upcase", Value::String(s)) => Value::String(s.to_uppercase()),
        ("downcase", Value::String(s)) => Value::String(s.to_lowercase()),
        ("strip", Value::String(s)) => Value::String(s.trim().to_string()),
        (method, value) => {
            return Err(EvalError::UnknownMethod {
                method: method.to_string(),
                kind: kind(value),
            })
        }
    };
    Ok(result)
}

fn index_into(target: Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::Null, _) => Err(EvalError::NilNavigation("[]".to_string())),
        (Value::Array(items), Value::Number(n)) if n.is_i64() => {
            let i = n.as_i64().unwrap_or_default();
            let len = items.len();
            let resolved = if i < 0 { len as i64 + i } else { i };
            if resolved < 0 || resolved >= len as i64 {
                return Err(EvalError::IndexOutOfRange { index: i, len });
            }
            Ok(items.into_iter().nth(resolved as usize).unwrap_or(Value::Null))
        }
        (Value::Object(mut map), Value::String(key)) => Ok(map.remove(key).unwrap_or(Value::Null)),
        (target, index) => Err(EvalError::UnsupportedIndex {
            target: kind(&target),
            index: kind(index),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processors::reformer::expression::parse;
    use chrono::{TimeZone, Utc};

    fn eval_with(tag: &str, record: Value, src: &str) -> Result<Value, EvalError> {
        let time = Utc.with_ymd_and_hms(2010, 2, 1, 4, 3, 2).unwrap();
        let ctx = PlaceholderContext::new(tag, time, "my-host");
        let record = match record {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        };
        let expr = parse(src).unwrap();
        evaluate(&expr, &Scope::new(&ctx, &record))
    }

    fn eval(src: &str) -> Result<Value, EvalError> {
        eval_with(
            "test.tag",
            json!({"message": "hello", "count": 3, "nested": {"inner": "x"}, "empty": null}),
            src,
        )
    }

    #[test]
    fn test_context_names() {
        assert_eq!(eval("tag").unwrap(), "test.tag");
        assert_eq!(eval("hostname").unwrap(), "my-host");
        assert_eq!(eval("time").unwrap(), "2010-02-01 04:03:02 +0000");
        assert_eq!(eval("time.to_s").unwrap(), "2010-02-01 04:03:02 +0000");
        assert_eq!(eval("tag_parts").unwrap(), json!(["test", "tag"]));
    }

    #[test]
    fn test_tag_parts_and_alias_indexing() {
        assert_eq!(eval("tag_parts[0]").unwrap(), "test");
        assert_eq!(eval("tag_parts[-1]").unwrap(), "tag");
        assert_eq!(eval("tags[0]").unwrap(), eval("tag_parts[0]").unwrap());
        assert_eq!(eval("tag_parts.last").unwrap(), "tag");
        assert_eq!(eval("tag_parts.first()").unwrap(), "test");
    }

    #[test]
    fn test_tag_prefix_and_suffix_forms() {
        let record = json!({});
        let tag = "prefix.test.tag.suffix";
        assert_eq!(eval_with(tag, record.clone(), "tag_prefix[1]").unwrap(), "prefix.test");
        assert_eq!(eval_with(tag, record.clone(), "tag_prefix[-2]").unwrap(), "prefix.test.tag");
        assert_eq!(eval_with(tag, record.clone(), "tag_suffix[2]").unwrap(), "tag.suffix");
        assert_eq!(eval_with(tag, record.clone(), "tag_suffix[-3]").unwrap(), "test.tag.suffix");
        assert_eq!(eval_with(tag, record.clone(), "tag_prefix(1)").unwrap(), "prefix");
        assert_eq!(eval_with(tag, record.clone(), "tag_prefix(-2)").unwrap(), "prefix.test");
        assert_eq!(eval_with(tag, record.clone(), "tag_suffix(2)").unwrap(), "tag.suffix");
        assert_eq!(eval_with(tag, record, "tag_suffix(-3)").unwrap(), "test.tag.suffix");
    }

    #[test]
    fn test_record_access() {
        assert_eq!(eval("message").unwrap(), "hello");
        assert_eq!(eval("count").unwrap(), 3);
        assert_eq!(eval("nested.inner").unwrap(), "x");
        assert_eq!(eval("nested['inner']").unwrap(), "x");
        assert_eq!(eval("record['message'].upcase").unwrap(), "HELLO");
        assert_eq!(eval("nested['missing']").unwrap(), Value::Null);
        assert_eq!(eval("empty").unwrap(), Value::Null);
        assert_eq!(eval("message.size").unwrap(), 5);
    }

    #[test]
    fn test_unknown_name_fails() {
        assert_eq!(
            eval("unknown['bar']").unwrap_err(),
            EvalError::UnknownName("unknown".to_string())
        );
    }

    #[test]
    fn test_nil_navigation_fails() {
        assert_eq!(
            eval("nested['missing']['deeper']").unwrap_err(),
            EvalError::NilNavigation("[]".to_string())
        );
        assert_eq!(
            eval("empty.upcase").unwrap_err(),
            EvalError::NilNavigation("upcase".to_string())
        );
    }

    #[test]
    fn test_index_errors() {
        assert_eq!(
            eval("tag_parts[2]").unwrap_err(),
            EvalError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(
            eval("tag_parts['a']").unwrap_err(),
            EvalError::UnsupportedIndex { target: "array", index: "string" }
        );
    }

    #[test]
    fn test_method_and_function_errors() {
        assert!(matches!(eval("count.upcase"), Err(EvalError::UnknownMethod { .. })));
        assert!(matches!(eval("escape(message)"), Err(EvalError::UnknownFunction(_))));
        assert!(matches!(eval("tag_prefix(1, 2)"), Err(EvalError::WrongArity { .. })));
        assert!(matches!(eval("tag_prefix('a')"), Err(EvalError::InvalidArgument { .. })));
        assert!(matches!(eval("message.upcase(1)"), Err(EvalError::WrongArity { .. })));
    }
}
