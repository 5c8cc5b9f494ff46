use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered key/value body of an event.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub tag: String,
    pub time: DateTime<Utc>,
    pub record: Record,
}

impl PipelineEvent {
    pub fn new(tag: impl Into<String>, time: DateTime<Utc>, record: Record) -> Self {
        Self {
            tag: tag.into(),
            time,
            record,
        }
    }

    /// Build an event from a JSON body, which must be an object.
    pub fn from_json(tag: impl Into<String>, time: DateTime<Utc>, body: Value) -> Option<Self> {
        match body {
            Value::Object(record) => Some(Self::new(tag, time, record)),
            _ => None,
        }
    }
}
