use serde::{Deserialize, Serialize};
use crate::error::{AppError, Result};
use crate::pipeline::processors::ProcessorConfig;
use crate::pipeline::sinks::SinkConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pipeline {
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
    pub sinks: Vec<SinkConfig>,
}

fn default_port() -> u16 {
    8080
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let config_path = std::env::var("CONFIGURATION_PATH")
            .unwrap_or_else(|_| "config/config.json".to_string());
        Self::from_file(&config_path)
    }

    /// `HTTP_PORT` wins over the configured port.
    pub fn get_port(&self) -> u16 {
        std::env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.server.port)
    }
}
