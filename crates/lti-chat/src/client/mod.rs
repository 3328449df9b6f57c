//! Async runtime around the controller.
//!
//! [`ChatClient::start`] spawns a driver task that owns the controller
//! and performs its effects: connect attempts, socket writes, retry
//! timers, and the elapsed-time tick. The caller talks to it through a
//! cloneable [`ChatHandle`] and receives [`ChatUpdate`](crate::ChatUpdate)s
//! on a channel.

mod driver;
mod handle;

#[cfg(test)]
mod tests;

pub use handle::{ChatClient, ChatHandle};
