//! Controller configuration loading.
//!
//! Parses a single TOML file into [`ControllerConfig`] and validates every
//! section's bounds before the controller is built.

use std::path::Path;

use carvin_common::config::{ConfigError, ConfigLoader};
use carvin_common::control::config::ControllerConfig;
use thiserror::Error;
use tracing::info;

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Missing file, I/O or TOML parse failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Parameter out of bounds.
    #[error("config validation: {0}")]
    Validation(String),
}

/// Load and validate the controller configuration from `path`.
pub fn load_config(path: &Path) -> Result<ControllerConfig, LoadError> {
    let config = ControllerConfig::load(path)?;
    config.validate().map_err(LoadError::Validation)?;
    info!(
        path = %path.display(),
        panel = ?config.input.panel,
        parking = config.parking.enabled,
        door_feature = config.safety_door.door_feature,
        "configuration loaded"
    );
    Ok(config)
}

/// Load from a TOML string (tests and embedded defaults).
pub fn load_config_from_str(content: &str) -> Result<ControllerConfig, LoadError> {
    let config = ControllerConfig::from_toml_str(content)?;
    config.validate().map_err(LoadError::Validation)?;
    Ok(config)
}
