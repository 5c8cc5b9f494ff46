use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Format used for the `time` placeholder.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Resolve the process hostname. Called once at startup; the result is
/// handed to every reformer explicitly.
pub fn resolve_hostname() -> std::io::Result<Arc<str>> {
    let name = hostname::get()?;
    Ok(Arc::from(name.to_string_lossy().trim_end()))
}

/// Placeholder namespace derived from one event's tag and time.
#[derive(Debug, Clone)]
pub struct PlaceholderContext<'a> {
    tag: &'a str,
    tag_parts: Vec<&'a str>,
    time: DateTime<Utc>,
    hostname: &'a str,
}

impl<'a> PlaceholderContext<'a> {
    pub fn new(tag: &'a str, time: DateTime<Utc>, hostname: &'a str) -> Self {
        Self {
            tag,
            tag_parts: tag.split('.').collect(),
            time,
            hostname,
        }
    }

    pub fn tag(&self) -> &'a str {
        self.tag
    }

    pub fn tag_parts(&self) -> &[&'a str] {
        &self.tag_parts
    }

    pub fn hostname(&self) -> &'a str {
        self.hostname
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn formatted_time(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }

    /// Parts `[..n]` joined with `.`. Negative `n` counts from the end;
    /// out-of-range values clamp.
    pub fn tag_prefix(&self, n: i64) -> String {
        let end = self.clamp(n);
        self.tag_parts[..end].join(".")
    }

    /// Parts `[n..]` joined with `.`, with the same index rules as
    /// [`tag_prefix`](Self::tag_prefix).
    pub fn tag_suffix(&self, n: i64) -> String {
        let start = self.clamp(n);
        self.tag_parts[start..].join(".")
    }

    /// Every prefix of the tag: element `i` ends at part `i` inclusive.
    pub fn tag_prefixes(&self) -> Vec<String> {
        (1..=self.tag_parts.len())
            .map(|end| self.tag_parts[..end].join("."))
            .collect()
    }

    /// Every suffix of the tag: element `i` starts at part `i`.
    pub fn tag_suffixes(&self) -> Vec<String> {
        (0..self.tag_parts.len())
            .map(|start| self.tag_parts[start..].join("."))
            .collect()
    }

    fn clamp(&self, n: i64) -> usize {
        let len = self.tag_parts.len() as i64;
        let idx = if n < 0 { len + n } else { n };
        idx.clamp(0, len) as usize
    }
}
