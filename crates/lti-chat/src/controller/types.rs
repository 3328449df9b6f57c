//! Options, effects, updates, and notices of the controller.

use std::time::Duration;

use lti_common::MessageId;
use lti_config::LtiConfig;

use crate::connection::{ConnectionState, RetryPolicy};
use crate::message::Message;

/// Everything the controller needs from configuration.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub quota_max: u32,
    pub welcome_message: String,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub send_exchange_id: bool,
}

impl ChatOptions {
    pub fn from_config(config: &LtiConfig) -> Self {
        Self {
            quota_max: config.session.quota_max,
            welcome_message: config.session.welcome_message.clone(),
            retry: RetryPolicy {
                max_retries: config.connection.max_retries,
                delay: config.connection.retry_delay(),
            },
            connect_timeout: config.connection.connect_timeout(),
            send_exchange_id: config.connection.send_exchange_id,
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::from_config(&LtiConfig::default())
    }
}

/// I/O requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a new connection for `generation`.
    Connect { generation: u64 },
    /// Write one encoded frame on the connection of `generation`.
    Send { generation: u64, payload: String },
    /// Release the connection (or pending attempt) of `generation`.
    Close { generation: u64 },
    /// Call `on_retry_elapsed(generation)` after `delay`.
    ScheduleRetry { generation: u64, delay: Duration },
    /// Tell the presentation side something changed.
    Emit(ChatUpdate),
}

/// User-visible notices. The text is fixed; backend detail never shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Blocking overlay while a connection is being established.
    Connecting,
    /// Request refused because the connection is not open.
    NotReady,
    /// Request refused because an answer is still pending.
    ExchangeOpen,
    /// Question limit reached. Persistent until dismissed or reset.
    QuotaReached,
    /// Reconnect attempts exhausted. Persistent until reset.
    ConnectivityFailed,
}

impl Notice {
    pub fn text(&self) -> &'static str {
        match self {
            Notice::Connecting => "Connecting to the assistant...",
            Notice::NotReady => "Still connecting to the assistant. Please try again in a moment.",
            Notice::ExchangeOpen => "Please wait for the current answer to finish.",
            Notice::QuotaReached => {
                concat!(
                    "You have reached the question limit for this chat. ",
                    "Start a new chat to keep asking."
                )
            }
            Notice::ConnectivityFailed => {
                "Unable to reach the assistant. Check your connection and start a new chat."
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Notice::QuotaReached | Notice::ConnectivityFailed)
    }
}

/// Changes pushed to the presentation side.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    ConnectionChanged(ConnectionState),
    Notice(Notice),
    NoticeCleared(Notice),
    MessageAppended(Message),
    /// Full reasoning text of the open exchange after a new chunk.
    ReasoningUpdated { id: MessageId, reasoning: String },
    ReasoningToggled { id: MessageId, expanded: bool },
    /// Whole seconds the open exchange has been waiting.
    Elapsed { id: MessageId, seconds: u64 },
    ExchangeClosed { id: MessageId },
    ConversationStarted { conversation_id: String },
    QuotaChanged { used: u32, remaining: u32, max: u32 },
    /// The log was replaced; `messages` is the new log.
    SessionReset { messages: Vec<Message> },
}

/// Point-in-time copy of the session for display.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub conversation_id: Option<String>,
    pub question_count: u32,
    pub remaining_questions: u32,
    pub quota_max: u32,
    pub connection: ConnectionState,
    pub limit_notice_visible: bool,
}
