use axum::{Router, routing::get, http::StatusCode};
use crate::pipeline::PipelineSender;
use crate::sources::http;

async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub fn create_router(pipeline_tx: PipelineSender) -> Router {
    let router = Router::new()
        .route("/-/healthz", get(health_check))
        .route("/-/ready", get(health_check));

    http::register_http_routes(router, pipeline_tx)
}
