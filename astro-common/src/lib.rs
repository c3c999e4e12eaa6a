//! # Astro Common Library
//!
//! Shared code for the astro services:
//! - Error types
//! - Configuration loading (TOML files, environment overrides)

pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Crate version, reported in response provenance
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
