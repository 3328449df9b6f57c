//! The single writer of session and connection state.
//!
//! [`ChatController`] receives every input as a method call and records
//! the I/O it wants done as [`Effect`]s. It never performs I/O itself,
//! which keeps the whole lifecycle testable without sockets or timers.

mod chat_controller;
mod types;


pub use chat_controller::ChatController;
pub use types::{ChatOptions, ChatUpdate, Effect, Notice, SessionSnapshot};
