use crate::error::{AppError, Result};
use crate::pipeline::event::PipelineEvent;
use super::Sink;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each event as one JSON line.
pub struct StdoutSink<W = tokio::io::Stdout> {
    writer: Mutex<W>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait::async_trait]
impl<W> Sink for StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&self, event: &PipelineEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| AppError::Sink(format!("Failed to write event: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| AppError::Sink(format!("Failed to flush output: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_writes_json_lines() {
        let sink = StdoutSink::with_writer(Vec::new());
        let time = Utc.with_ymd_and_hms(2010, 2, 1, 4, 3, 2).unwrap();

        for tag in ["a.b", "c"] {
            let event = PipelineEvent::from_json(tag, time, json!({"k": tag})).unwrap();
            sink.write(&event).await.unwrap();
        }

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["tag"], "a.b");
        assert_eq!(lines[0]["time"], "2010-02-01T04:03:02Z");
        assert_eq!(lines[1]["record"]["k"], "c");
    }
}
