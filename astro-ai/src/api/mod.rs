//! HTTP API handlers for astro-ai

pub mod analyze;
pub mod artifacts;
pub mod auth;
pub mod health;

pub use analyze::analyze_routes;
pub use artifacts::artifact_routes;
pub use auth::require_api_key;
pub use health::health_routes;
