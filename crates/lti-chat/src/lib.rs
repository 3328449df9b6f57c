//! Client core for the LTI stock-analysis assistant.
//!
//! One chat session talks to the assistant service over a single
//! WebSocket. The session keeps a message log, remembers the
//! conversation id the service assigns, counts questions against a
//! quota, and allows one request in flight at a time. Lost connections
//! are retried a bounded number of times with a fixed delay.
//!
//! Layers, bottom up:
//!
//! - [`protocol`]: the JSON frames on the wire.
//! - [`session`], [`message`], [`gate`]: session state and admission.
//! - [`connection`]: the reconnect state machine and transport links.
//! - [`controller`]: ties the above together without doing I/O.
//! - [`client`]: a tokio driver around the controller.

pub mod client;
pub mod clock;
pub mod connection;
pub mod controller;
pub mod gate;
pub mod message;
pub mod observer;
pub mod protocol;
pub mod session;

pub use client::{ChatClient, ChatHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{ConnectionState, Connector, Link, LinkEvent, RetryPolicy, WsConnector};
pub use controller::{ChatController, ChatOptions, ChatUpdate, Effect, Notice, SessionSnapshot};
pub use message::{Message, Role, StreamingState};
pub use observer::{AdmittedRequest, ObserverResult, SessionObserver, TracingObserver};
pub use session::{SessionState, APOLOGY};
