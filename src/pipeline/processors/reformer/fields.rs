use serde_json::Value;

use super::context::PlaceholderContext;
use super::resolver::{ReformWarning, Resolver};
use crate::pipeline::event::Record;

/// Output of applying the tag and field templates to one event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReformedFields {
    /// `None` when the tag template failed or produced an empty string.
    pub tag: Option<String>,
    pub fields: Vec<(String, Value)>,
    pub warnings: Vec<ReformWarning>,
}

/// Tag template plus field templates, in declaration order.
#[derive(Debug)]
pub struct FieldReformer {
    tag: Box<dyn Resolver>,
    fields: Vec<(String, Box<dyn Resolver>)>,
}

impl FieldReformer {
    pub fn new(tag: Box<dyn Resolver>, fields: Vec<(String, Box<dyn Resolver>)>) -> Self {
        Self { tag, fields }
    }

    pub fn tag_template(&self) -> &str {
        self.tag.source()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Resolve every template against the original record.
    pub fn reform(&self, context: &PlaceholderContext<'_>, record: &Record) -> ReformedFields {
        let tag_resolution = self.tag.resolve(context, record);
        let tag = tag_resolution.non_empty_string();
        let mut warnings = tag_resolution.warnings;
        if tag.is_none() && warnings.is_empty() {
            warnings.push(ReformWarning::EmptyTag {
                template: self.tag.source().to_string(),
            });
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, template) in &self.fields {
            let resolution = template.resolve(context, record);
            warnings.extend(resolution.warnings);
            fields.push((name.clone(), resolution.value.unwrap_or(Value::Null)));
        }

        ReformedFields {
            tag,
            fields,
            warnings,
        }
    }
}
