//! Public entry points: the client builder and the command handle.

use std::sync::Arc;

use lti_common::{LtiError, MessageId};
use lti_config::LtiConfig;
use tokio::sync::{mpsc, oneshot};

use crate::clock::{Clock, SystemClock};
use crate::connection::{Connector, WsConnector};
use crate::controller::{ChatController, ChatOptions, ChatUpdate, SessionSnapshot};
use crate::observer::{SessionObserver, TracingObserver};

use super::driver::{Command, Driver};

/// Capacity of the update channel handed to the caller.
const UPDATE_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds and starts a chat session.
pub struct ChatClient {
    options: ChatOptions,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl ChatClient {
    /// A client for the service at `config.connection.url`, with the
    /// tracing observer installed.
    pub fn new(config: &LtiConfig) -> Self {
        Self {
            options: ChatOptions::from_config(config),
            connector: Arc::new(WsConnector::new(config.connection.url.clone())),
            clock: Arc::new(SystemClock),
            observers: vec![Box::new(TracingObserver)],
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Spawn the driver and open the first connection.
    ///
    /// Must be called from within a tokio runtime. The session ends when
    /// every handle is dropped or [`ChatHandle::shutdown`] is called.
    ///
    /// The returned receiver must be drained. Once `UPDATE_BUFFER` updates
    /// are queued the driver waits for room, and until then it handles no
    /// commands, frames or timers. A consumer that only calls the handle
    /// and never reads updates will see its calls hang.
    pub fn start(self) -> (ChatHandle, mpsc::Receiver<ChatUpdate>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);

        let controller = self
            .observers
            .into_iter()
            .fold(ChatController::new(&self.options, self.clock), |c, o| {
                c.with_observer(o)
            });
        let driver = Driver::new(
            controller,
            self.connector,
            self.options.connect_timeout,
            update_tx,
        );
        tokio::spawn(driver.run(command_rx));

        (
            ChatHandle {
                commands: command_tx,
            },
            update_rx,
        )
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("options", &self.options)
            .field("observers", &self.observers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable handle to a running session.
///
/// Every method fails with [`LtiError::ChannelClosed`] once the driver
/// has stopped.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    commands: mpsc::Sender<Command>,
}

impl ChatHandle {
    /// Submit a question. Refused requests come back as
    /// [`LtiError::Rejected`].
    pub async fn submit(&self, text: impl Into<String>) -> Result<MessageId, LtiError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit {
            text: text.into(),
            reply,
        })
        .await?;
        let admitted = rx.await.map_err(|_| LtiError::ChannelClosed)?;
        Ok(admitted?)
    }

    /// Start a new chat on a fresh connection.
    pub async fn reset(&self) -> Result<(), LtiError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reset { reply }).await?;
        rx.await.map_err(|_| LtiError::ChannelClosed)
    }

    /// Expand or collapse the reasoning of a finished exchange. Returns
    /// the new state, or `None` if the message has nothing to toggle.
    pub async fn toggle_reasoning(&self, id: MessageId) -> Result<Option<bool>, LtiError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ToggleReasoning { id, reply }).await?;
        rx.await.map_err(|_| LtiError::ChannelClosed)
    }

    pub async fn dismiss_limit_notice(&self) -> Result<(), LtiError> {
        self.send(Command::DismissLimitNotice).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, LtiError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| LtiError::ChannelClosed)
    }

    /// Close the connection and stop the driver. Waits until the close
    /// has been sent.
    pub async fn shutdown(&self) -> Result<(), LtiError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| LtiError::ChannelClosed)
    }

    async fn send(&self, command: Command) -> Result<(), LtiError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LtiError::ChannelClosed)
    }
}
