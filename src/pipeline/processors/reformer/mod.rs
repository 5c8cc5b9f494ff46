//! Record reformer: rewrites an event's tag and record from templates.
//!
//! Per event the reformer builds a [`PlaceholderContext`] from the tag,
//! time and hostname, resolves the tag and field templates against the
//! original record, then merges the new fields according to the
//! [`RetentionPolicy`]. An event whose tag cannot be resolved is dropped.

pub mod config;
pub mod context;
pub mod expression;
pub mod fields;
pub mod merge;
pub mod resolver;

use std::sync::Arc;
use tracing::{debug, warn};

use super::Processor;
use crate::error::Result;
use crate::pipeline::event::PipelineEvent;
use config::{ReformerConfig, ReformerDirectives};
use context::PlaceholderContext;
use resolver::ReformWarning;

pub use merge::RetentionPolicy;

/// Result of reforming one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Reformation {
    /// `None` when the event was suppressed.
    pub event: Option<PipelineEvent>,
    pub warnings: Vec<ReformWarning>,
}

#[derive(Debug)]
pub struct RecordReformer {
    config: ReformerConfig,
    hostname: Arc<str>,
}

impl RecordReformer {
    pub fn new(directives: &ReformerDirectives, hostname: Arc<str>) -> Result<Self> {
        let config = ReformerConfig::from_directives(directives)?;
        debug!(
            "record_reformer configured: tag='{}', mode={:?}, fields={}",
            config.templates.tag_template(),
            config.mode,
            config.templates.field_names().count()
        );
        Ok(Self { config, hostname })
    }

    /// Transform one event. Warnings are logged and also returned.
    pub fn reform(&self, event: &PipelineEvent) -> Reformation {
        let context = PlaceholderContext::new(&event.tag, event.time, &self.hostname);
        let reformed = self.config.templates.reform(&context, &event.record);

        for warning in &reformed.warnings {
            warn!("record_reformer: {}", warning);
        }

        let Some(tag) = reformed.tag else {
            debug!("record_reformer: dropping event from '{}', tag did not resolve", event.tag);
            return Reformation {
                event: None,
                warnings: reformed.warnings,
            };
        };

        let record = self.config.policy.merge(&event.record, reformed.fields);

        Reformation {
            event: Some(PipelineEvent::new(tag, event.time, record)),
            warnings: reformed.warnings,
        }
    }
}

#[async_trait::async_trait]
impl Processor for RecordReformer {
    async fn process(&self, event: PipelineEvent) -> Result<Option<PipelineEvent>> {
        Ok(self.reform(&event).event)
    }
}
