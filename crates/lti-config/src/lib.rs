//! Configuration for the LTI chat client.
//!
//! TOML-based configuration. All sections use defaults so partial configs
//! work out of the box. Values that fail validation are reported as a
//! warning and kept, so one bad field never discards the rest of a file.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lti_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.connection.url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{ConnectionConfig, LogLevel, LoggingConfig, LtiConfig, SessionConfig};

use lti_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path.
///
/// Creates a documented default file if none exists.
pub fn load_config() -> Result<LtiConfig, ConfigError> {
    toml_loader::load_default()
}

/// Load config from an explicit path, e.g. a `--config` override.
///
/// A missing file is an error here; only the default location gets a
/// generated template.
pub fn load_config_from(path: &Path) -> Result<LtiConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    toml_loader::load_from_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_from_missing_path_is_file_not_found() {
        let err = load_config_from(Path::new("/tmp/nonexistent_lti_config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn out_of_range_value_keeps_rest_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[connection]
url = "wss://prod.example/ws"

[session]
quota_max = 0
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.connection.url, "wss://prod.example/ws");
        assert_eq!(config.session.quota_max, 0);
        assert!(validation::validate(&config).is_err());
    }
}
