use crate::config::{AppConfig, Pipeline};
use crate::error::Result;
use crate::pipeline::event::PipelineEvent;
use crate::pipeline::processors::{Processor, ProcessorConfig, reformer::RecordReformer};
use crate::pipeline::sinks::{Sink, SinkConfig, stdout::StdoutSink};
use crate::pipeline::PipelineReceiver;
use std::sync::Arc;
use tracing::{info, error, debug};

pub struct PipelineExecutor {
    pipelines: Vec<PipelineInstance>,
}

pub struct PipelineInstance {
    processors: Vec<Box<dyn Processor>>,
    sinks: Vec<Arc<dyn Sink>>,
}

impl PipelineInstance {
    pub fn new(processors: Vec<Box<dyn Processor>>, sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { processors, sinks }
    }
}

impl PipelineExecutor {
    /// Build every configured pipeline. `hostname` is shared by all reformers.
    pub fn new(config: &AppConfig, hostname: Arc<str>) -> Result<Self> {
        let pipelines = config
            .pipelines
            .iter()
            .map(|pipeline_config| Self::create_pipeline(pipeline_config, &hostname))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { pipelines })
    }

    pub fn from_pipelines(pipelines: Vec<PipelineInstance>) -> Self {
        Self { pipelines }
    }

    fn create_pipeline(pipeline_config: &Pipeline, hostname: &Arc<str>) -> Result<PipelineInstance> {
        let mut processors: Vec<Box<dyn Processor>> = Vec::new();

        for processor_config in &pipeline_config.processors {
            match processor_config {
                ProcessorConfig::RecordReformer(directives) => {
                    let reformer = RecordReformer::new(directives, Arc::clone(hostname))?;
                    processors.push(Box::new(reformer));
                }
            }
        }

        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

        for sink_config in &pipeline_config.sinks {
            match sink_config {
                SinkConfig::Stdout => sinks.push(Arc::new(StdoutSink::new())),
            }
        }

        Ok(PipelineInstance::new(processors, sinks))
    }

    pub async fn run(self, mut receiver: PipelineReceiver) {
        info!("Pipeline executor started with {} pipelines", self.pipelines.len());

        while let Some(event) = receiver.recv().await {
            debug!("Received event: tag={}", event.tag);

            for (idx, pipeline) in self.pipelines.iter().enumerate() {
                if let Err(e) = self.process_event(&event, pipeline, idx).await {
                    error!("Error processing event in pipeline {}: {}", idx, e);
                }
            }
        }

        info!("Pipeline executor stopped");
    }

    async fn process_event(&self, event: &PipelineEvent, pipeline: &PipelineInstance, pipeline_idx: usize) -> Result<()> {
        let mut current_event = event.clone();

        for (idx, processor) in pipeline.processors.iter().enumerate() {
            match processor.process(current_event).await? {
                Some(processed_event) => {
                    current_event = processed_event;
                    debug!("Event passed through processor {} in pipeline {}", idx, pipeline_idx);
                }
                None => {
                    debug!("Event dropped by processor {} in pipeline {}", idx, pipeline_idx);
                    return Ok(());
                }
            }
        }

        for (idx, sink) in pipeline.sinks.iter().enumerate() {
            match sink.write(&current_event).await {
                Ok(_) => {
                    debug!("Event written to sink {} in pipeline {}", idx, pipeline_idx);
                }
                Err(e) => {
                    // remaining sinks still get the event
                    error!("Failed to write event to sink {} in pipeline {}: {}", idx, pipeline_idx, e);
                }
            }
        }

        Ok(())
    }
}
