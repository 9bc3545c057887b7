//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::IrConfig;
use std::path::Path;

/// Name of the configuration file looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "weft.toml";

/// Loads and validates `<dir>/weft.toml`.
pub fn load_config(dir: &Path) -> Result<IrConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    let content =
        std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<IrConfig, ConfigError> {
    let config: IrConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &IrConfig) -> Result<(), ConfigError> {
    for name in &config.ir.reserved_names {
        if name.is_empty() {
            return Err(ConfigError::Invalid(
                "ir.reserved_names contains an empty name".to_string(),
            ));
        }
    }
    if config.scopes.keys().any(|name| name.is_empty()) {
        return Err(ConfigError::Invalid(
            "scope override with an empty name".to_string(),
        ));
    }
    Ok(())
}
