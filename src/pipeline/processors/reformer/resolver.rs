use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{anychar, char},
    combinator::{map, not, recognize},
    error::Error,
    multi::{many0, many0_count, many1_count},
    sequence::{delimited, pair, preceded},
    IResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use super::context::PlaceholderContext;
use super::expression::{self, EvalError, Expr, Scope, SyntaxError};
use crate::pipeline::event::Record;

static BARE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

/// How `${...}` spans are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Only bare `${name}` tokens are placeholders.
    Restricted,
    /// Every `${...}` span is an expression.
    Expression,
}

/// Non-fatal problem found while resolving a template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReformWarning {
    #[error("unknown placeholder '{placeholder}' found")]
    UnknownPlaceholder { placeholder: String },

    #[error("failed to expand '{template}': {source}")]
    ExpansionFailed {
        template: String,
        #[source]
        source: EvalError,
    },

    #[error("tag '{template}' expanded to an empty string")]
    EmptyTag { template: String },
}

/// Outcome of resolving one template. `value` is `None` when the template
/// resolved to nil.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: Option<Value>,
    pub warnings: Vec<ReformWarning>,
}

impl Resolution {
    fn resolved(value: Value) -> Self {
        Self {
            value: Some(value),
            warnings: Vec::new(),
        }
    }

    /// The resolved value as a non-empty string, if any.
    pub fn non_empty_string(&self) -> Option<String> {
        self.value
            .as_ref()
            .map(string_form)
            .filter(|s| !s.is_empty())
    }
}

/// A compiled template that can be expanded against one event.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Template text as configured.
    fn source(&self) -> &str;

    fn resolve(&self, context: &PlaceholderContext<'_>, record: &Record) -> Resolution;
}

/// Compile `template` for the given mode.
pub fn compile(
    template: &str,
    mode: EvaluationMode,
    auto_typecast: bool,
) -> Result<Box<dyn Resolver>, SyntaxError> {
    Ok(match mode {
        EvaluationMode::Restricted => Box::new(RestrictedResolver::compile(template, auto_typecast)),
        EvaluationMode::Expression => Box::new(ExpressionResolver::compile(template, auto_typecast)?),
    })
}

/// String form used when a value is spliced into a template.
pub fn string_form(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment<T> {
    Literal(String),
    Placeholder(T),
}

fn is_single_placeholder<T>(segments: &[Segment<T>]) -> bool {
    matches!(segments, [Segment::Placeholder(_)])
}

#[derive(Debug, Clone)]
pub struct RestrictedResolver {
    source: String,
    segments: Vec<Segment<String>>,
    auto_typecast: bool,
}

impl RestrictedResolver {
    pub fn compile(template: &str, auto_typecast: bool) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in BARE_PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Self {
            source: template.to_string(),
            segments,
            auto_typecast,
        }
    }

    fn lookup(name: &str, context: &PlaceholderContext<'_>, record: &Record) -> Option<Value> {
        match name {
            "tag" => Some(Value::String(context.tag().to_string())),
            "time" => Some(Value::String(context.formatted_time())),
            "hostname" => Some(Value::String(context.hostname().to_string())),
            _ => record.get(name).cloned(),
        }
    }
}

impl Resolver for RestrictedResolver {
    fn source(&self) -> &str {
        &self.source
    }

    fn resolve(&self, context: &PlaceholderContext<'_>, record: &Record) -> Resolution {
        let mut warnings = Vec::new();
        let mut out = String::with_capacity(self.source.len());
        let mut single = None;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match Self::lookup(name, context, record) {
                    Some(value) => {
                        out.push_str(&string_form(&value));
                        single = Some(value);
                    }
                    None => warnings.push(ReformWarning::UnknownPlaceholder {
                        placeholder: format!("${{{}}}", name),
                    }),
                },
            }
        }

        let value = if is_single_placeholder(&self.segments) {
            match single {
                Some(raw) if self.auto_typecast => Some(raw),
                Some(_) => Some(Value::String(out)),
                None => None,
            }
        } else {
            Some(Value::String(out))
        };

        Resolution { value, warnings }
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionResolver {
    source: String,
    segments: Vec<Segment<Expr>>,
    auto_typecast: bool,
}

impl ExpressionResolver {
    pub fn compile(template: &str, auto_typecast: bool) -> Result<Self, SyntaxError> {
        let mut segments = Vec::new();
        for span in split_spans(template) {
            segments.push(match span {
                Span::Literal(text) => Segment::Literal(text.to_string()),
                Span::Expression(body) => Segment::Placeholder(expression::parse(body)?),
            });
        }

        Ok(Self {
            source: template.to_string(),
            segments,
            auto_typecast,
        })
    }
}

impl Resolver for ExpressionResolver {
    fn source(&self) -> &str {
        &self.source
    }

    fn resolve(&self, context: &PlaceholderContext<'_>, record: &Record) -> Resolution {
        let scope = Scope::new(context, record);
        let mut out = String::with_capacity(self.source.len());
        let mut single = None;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(expr) => match expression::evaluate(expr, &scope) {
                    Ok(value) => {
                        out.push_str(&string_form(&value));
                        single = Some(value);
                    }
                    Err(source) => {
                        return Resolution {
                            value: None,
                            warnings: vec![ReformWarning::ExpansionFailed {
                                template: self.source.clone(),
                                source,
                            }],
                        }
                    }
                },
            }
        }

        match single {
            Some(raw) if self.auto_typecast && is_single_placeholder(&self.segments) => {
                Resolution::resolved(raw)
            }
            _ => Resolution::resolved(Value::String(out)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

type PResult<'a, O> = IResult<&'a str, O, Error<&'a str>>;

fn quoted_raw<'a>(quote: char, stop: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    recognize(delimited(
        char(quote),
        many0_count(alt((recognize(pair(char('\\'), anychar)), is_not(stop)))),
        char(quote),
    ))
}

/// Body of a `${...}` span. A `}` inside a quoted string does not close it.
fn placeholder(input: &str) -> PResult<'_, &str> {
    delimited(
        tag("${"),
        recognize(many0_count(alt((
            quoted_raw('\'', "'\\"),
            quoted_raw('"', "\"\\"),
            is_not("}'\""),
        )))),
        char('}'),
    )(input)
}

fn literal(input: &str) -> PResult<'_, &str> {
    recognize(many1_count(alt((
        is_not("$"),
        recognize(preceded(not(placeholder), anychar)),
    ))))(input)
}

/// Split a template into literal text and `${...}` bodies. An unclosed
/// `${` is literal text.
fn split_spans(template: &str) -> Vec<Span<'_>> {
    let spans = many0(alt((
        map(placeholder, Span::Expression),
        map(literal, Span::Literal),
    )))(template);

    match spans {
        Ok((_, spans)) => spans,
        Err(_) => vec![Span::Literal(template)],
    }
}
