//! astro-ai library interface
//!
//! Galaxy image pipeline: resolve a target name, acquire an image through
//! ordered fallback sources and analyze it. Exposed as a library for the
//! binary and for integration testing.

pub mod acquisition;
pub mod analysis;
pub mod api;
pub mod artifacts;
pub mod clients;
pub mod config;
pub mod error;
pub mod language;
pub mod models;
pub mod types;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use crate::config::ServiceConfig;
use crate::workflow::PipelineOrchestrator;
use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared pipeline (stateless between requests)
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: PipelineOrchestrator, config: ServiceConfig) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/health` is open; analyze and artifact routes sit behind the API-key check.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(api::analyze_routes())
        .merge(api::artifact_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_api_key,
        ));

    Router::new()
        .merge(api::health_routes())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
