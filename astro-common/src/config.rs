//! Configuration file discovery, TOML loading and environment lookups
//!
//! Resolution order used by the services:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Environment variable that points at an explicit config file
pub const CONFIG_PATH_ENV: &str = "ASTRO_CONFIG";

/// Locate the TOML config file for a module.
///
/// Checks `ASTRO_CONFIG` first, then the per-user config directory
/// (`~/.config/astro/<module>.toml` on Linux), then `/etc/astro/<module>.toml`.
/// Returns `None` when no file exists; a missing config is not an error.
pub fn find_config_file(module_name: &str) -> Option<PathBuf> {
    if let Some(explicit) = env_var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(explicit);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points at missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("astro").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/astro").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file into `T`.
///
/// # Errors
/// `Io` when the file cannot be read, `Config` when it does not parse.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Parse TOML text into `T`.
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Load the module's TOML config, falling back to `T::default()`.
///
/// A missing file yields defaults silently; an unreadable or malformed file
/// yields defaults with a warning so the service still starts.
pub fn load_or_default<T: DeserializeOwned + Default>(module_name: &str) -> T {
    match find_config_file(module_name) {
        Some(path) => match load_toml(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}: {}; using compiled defaults", path.display(), e);
                T::default()
            }
        },
        None => {
            debug!("No config file for {}; using compiled defaults", module_name);
            T::default()
        }
    }
}

/// Read an environment variable, ignoring blank values
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean flag the way operators tend to write them
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Boolean environment override; unparseable values are ignored with a warning
pub fn env_bool(name: &str) -> Option<bool> {
    let raw = env_var(name)?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        warn!("Ignoring {}={:?}: not a boolean", name, raw);
    }
    parsed
}

/// Typed environment override; unparseable values are ignored with a warning
pub fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: invalid value", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        for v in ["1", "true", "YES", " on ", "y"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "False", "no", "off", "n"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_toml_reports_config_error() {
        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Sample {
            port: u16,
        }

        let err = parse_toml::<Sample>("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
