use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;

use call_sentiment::infrastructure::observability::init_tracing;
use call_sentiment::presentation::{
    AppState, Environment, Settings, bootstrap_from_settings, create_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(
        settings.logging.format,
        &settings.logging.filter,
        settings.server.port,
    );

    tracing::info!(
        environment = %environment,
        transcription_model = %settings.transcription.model,
        sentiment_model = %settings.sentiment.model,
        "Starting call sentiment service"
    );

    let bootstrap_settings = settings.clone();
    let status = tokio::task::spawn_blocking(move || bootstrap_from_settings(&bootstrap_settings))
        .await
        .context("Model loading task panicked")?;

    if !status.is_ready() {
        tracing::error!("Models failed to load; every analysis request will be rejected");
    }

    let state = AppState::new(status, settings.upload.max_file_size_bytes());
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
