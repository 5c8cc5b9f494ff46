pub mod routes;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use crate::config::AppConfig;
use crate::pipeline::PipelineSender;
use crate::error::Result;

pub async fn run_server(config: &AppConfig, pipeline_tx: PipelineSender) -> Result<()> {
    let router = routes::create_router(pipeline_tx).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.get_port()));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
