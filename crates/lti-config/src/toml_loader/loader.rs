//! Reading `config.toml` into an [`LtiConfig`].

use std::path::Path;

use lti_common::ConfigError;
use tracing::{info, warn};

use crate::schema::LtiConfig;
use crate::validation;

use super::paths::{create_default_config, default_config_path};

/// Parse the file at `path`.
///
/// Absent keys take their defaults. Validation problems are logged and
/// the values are kept as written.
pub fn load_from_path(path: &Path) -> Result<LtiConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("cannot read {}: {e}", path.display())))?;
    let config: LtiConfig = toml::from_str(&text)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    match validation::validate(&config) {
        Ok(()) => info!(path = %path.display(), "Config loaded"),
        Err(e) => warn!(path = %path.display(), "Config loaded with invalid values: {e}"),
    }
    Ok(config)
}

/// Parse `config.toml` in the user config directory, writing the
/// commented template there first if it does not exist yet.
pub fn load_default() -> Result<LtiConfig, ConfigError> {
    let path = default_config_path()?;
    if path.exists() {
        return load_from_path(&path);
    }
    create_default_config(&path)?;
    Ok(LtiConfig::default())
}
