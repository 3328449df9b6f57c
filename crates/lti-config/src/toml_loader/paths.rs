//! Where the config file lives.

use std::path::{Path, PathBuf};

use lti_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

/// `<config dir>/lti/config.toml`, e.g. `~/.config/lti/config.toml` on Linux.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("lti").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("no user config directory on this platform".into()))
}

/// Write the commented template to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_err = |e: std::io::Error| {
        ConfigError::ParseError(format!("cannot write {}: {e}", path.display()))
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    std::fs::write(path, default_config_toml()).map_err(write_err)?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}
