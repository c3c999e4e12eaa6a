//! astro-ai - Galaxy image analysis service
//!
//! Resolves a target, fetches a survey image and runs segmentation,
//! measurement and morphology summaries over HTTP (JSON and SSE).

use anyhow::{Context, Result};
use astro_ai::artifacts::FsArtifactStore;
use astro_ai::config::ServiceConfig;
use astro_ai::workflow::PipelineOrchestrator;
use astro_ai::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::resolve();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting astro-ai (Galaxy Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        bind_addr = %config.bind_addr,
        artifact_dir = %config.artifact_dir.display(),
        require_api_key = config.require_api_key,
        verify_tls = config.pipeline.verify_tls,
        "Configuration resolved"
    );

    let store = Arc::new(FsArtifactStore::new(config.artifact_dir.clone()));
    let orchestrator = PipelineOrchestrator::new(config.pipeline.clone(), store)
        .context("Failed to build pipeline")?;

    let bind_addr = config.bind_addr.clone();
    let app = astro_ai::build_router(AppState::new(orchestrator, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
