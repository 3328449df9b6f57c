//! Connection lifecycle: the reconnect state machine and the transport
//! links it drives.
//!
//! [`ConnectionManager`] decides when to connect, retry, or give up. It
//! performs no I/O. [`Link`] and [`Connector`] are the I/O side and are
//! used by the client driver.

mod link;
mod manager;

pub use link::{Connector, Link, LinkEvent, WsConnector};
pub use manager::{ConnectionManager, ConnectionState, LossOutcome, RetryPolicy};
