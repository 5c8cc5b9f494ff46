use record_reformer::{
    config::AppConfig,
    pipeline::{create_pipeline_channel, executor::PipelineExecutor, processors::reformer::context::resolve_hostname},
    server::run_server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let use_ansi = atty::is(atty::Stream::Stdout);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("record_reformer={},tower_http=debug", log_level).into());

    // events go to stdout, so logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(use_ansi)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    let config = AppConfig::from_env()?;
    let hostname = resolve_hostname()?;
    tracing::info!("Resolved hostname: {}", hostname);

    let (pipeline_tx, pipeline_rx) = create_pipeline_channel(100);

    let executor = PipelineExecutor::new(&config, hostname)?;
    tokio::spawn(async move {
        executor.run(pipeline_rx).await;
    });

    run_server(&config, pipeline_tx).await?;

    Ok(())
}
