//! TOML config loading.

use std::path::Path;

use telestrator_common::ConfigError;
use tracing::{info, warn};

use crate::schema::TelestratorConfig;
use crate::validation;

/// Load config from a specific TOML file path.
///
/// Missing fields fall back to their defaults. The result is validated
/// before it is returned.
pub fn load_from_path(path: &Path) -> Result<TelestratorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: TelestratorConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    validation::validate(&config)?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from `path` if given, otherwise use built-in defaults.
pub fn load(path: Option<&Path>) -> Result<TelestratorConfig, ConfigError> {
    match path {
        Some(path) => load_from_path(path),
        None => {
            warn!("no config file given, using defaults");
            Ok(TelestratorConfig::default())
        }
    }
}
