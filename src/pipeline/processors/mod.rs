pub mod reformer;

use crate::error::Result;
use crate::pipeline::event::PipelineEvent;
use reformer::config::ReformerDirectives;
use serde::{Deserialize, Serialize};

/// Processor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ProcessorConfig {
    #[serde(rename = "record_reformer")]
    RecordReformer(ReformerDirectives),
}

/// Trait for event processors
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    /// Process an event, returning Some(event) if it should continue, None if dropped
    async fn process(&self, event: PipelineEvent) -> Result<Option<PipelineEvent>>;
}
