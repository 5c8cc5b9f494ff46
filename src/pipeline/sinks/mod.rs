pub mod stdout;

use crate::error::Result;
use crate::pipeline::event::PipelineEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Stdout,
}

#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, event: &PipelineEvent) -> Result<()>;
}
