use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::pipeline::processors::reformer::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid record_reformer configuration: {0}")]
    Reformer(#[from] ConfigError),

    #[error("Request body must be a JSON object")]
    RecordNotObject,

    #[error("Invalid event time: {0}")]
    InvalidTime(i64),

    #[error("Failed to send event to pipeline")]
    PipelineSend,

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Reformer(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::RecordNotObject => (StatusCode::BAD_REQUEST, "Record must be a JSON object".to_string()),
            AppError::InvalidTime(t) => (StatusCode::BAD_REQUEST, format!("Invalid time: {}", t)),
            AppError::PipelineSend => (StatusCode::INTERNAL_SERVER_ERROR, "Pipeline error".to_string()),
            AppError::Processing(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Processing error: {}", e)),
            AppError::Sink(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Sink error: {}", e)),
            AppError::JsonParse(e) => (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)),
            AppError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("IO error: {}", e)),
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
