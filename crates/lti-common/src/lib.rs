pub mod errors;
pub mod id;

pub use errors::{ConfigError, LtiError, ProtocolError, Rejection, TransportError};
pub use id::{new_id, MessageId};

pub type Result<T> = std::result::Result<T, LtiError>;
