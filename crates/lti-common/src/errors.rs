use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// An inbound payload that could not be turned into a frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame decode error: {0}")]
    Decode(String),

    #[error("frame encode error: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed: {0}")]
    Closed(String),
}

/// Why a request was refused admission. The session is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("request is empty")]
    EmptyRequest,

    #[error("connection is not ready")]
    NotReady,

    #[error("question limit reached")]
    QuotaReached,

    #[error("another request is still in progress")]
    ExchangeOpen,
}

#[derive(Debug, thiserror::Error)]
pub enum LtiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("chat driver is no longer running")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}
