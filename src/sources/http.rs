use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use crate::error::{AppError, Result};
use crate::pipeline::{PipelineSender, event::PipelineEvent};

pub struct HttpSourceState {
    pub pipeline_tx: PipelineSender,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventParams {
    /// Event time as unix seconds; defaults to now.
    pub time: Option<i64>,
}

/// `POST /{tag}` with a JSON object body emits one event tagged `tag`.
pub fn register_http_routes(router: Router, pipeline_tx: PipelineSender) -> Router {
    let state = Arc::new(HttpSourceState { pipeline_tx });
    router.route("/:tag", post(handle_event).with_state(state))
}

pub async fn handle_event(
    State(state): State<Arc<HttpSourceState>>,
    Path(tag): Path<String>,
    Query(params): Query<EventParams>,
    Json(body): Json<Value>,
) -> Result<StatusCode> {
    let time = match params.time {
        Some(secs) => DateTime::<Utc>::from_timestamp(secs, 0).ok_or(AppError::InvalidTime(secs))?,
        None => Utc::now(),
    };

    let event = PipelineEvent::from_json(tag, time, body).ok_or(AppError::RecordNotObject)?;
    tracing::debug!("Accepted event with tag {}", event.tag);

    state.pipeline_tx
        .send(event)
        .await
        .map_err(|_| AppError::PipelineSend)?;

    Ok(StatusCode::OK)
}
