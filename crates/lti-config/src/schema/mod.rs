//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod connection;
mod logging;
mod session;

pub use connection::*;
pub use logging::*;
pub use session::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LtiConfig {
    pub connection: ConnectionConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}
