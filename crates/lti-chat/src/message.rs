//! Messages in the session log.

use std::time::{Duration, Instant};

use lti_common::MessageId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Accumulation state of an exchange, carried by the user message that
/// opened it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingState {
    /// Reasoning text received so far, one chunk per line.
    pub buffer: String,
    /// Whether the exchange is still waiting for `final`/`error`.
    pub is_open: bool,
    pub opened_at: Option<Instant>,
    /// Whether the reasoning panel is shown.
    pub is_expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    streaming: StreamingState,
}

impl Message {
    /// A user message that opens a new exchange.
    pub(crate) fn opening(content: String, now: Instant) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content,
            streaming: StreamingState {
                buffer: String::new(),
                is_open: true,
                opened_at: Some(now),
                is_expanded: true,
            },
        }
    }

    pub(crate) fn assistant(content: String) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content,
            streaming: StreamingState::default(),
        }
    }

    pub(crate) fn welcome(content: String) -> Self {
        Self {
            id: MessageId::from_static(WELCOME_ID),
            ..Self::assistant(content)
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn streaming(&self) -> &StreamingState {
        &self.streaming
    }

    pub fn reasoning(&self) -> &str {
        &self.streaming.buffer
    }

    pub fn is_open(&self) -> bool {
        self.streaming.is_open
    }

    pub fn is_welcome(&self) -> bool {
        self.id.as_str() == WELCOME_ID
    }

    /// Time since the exchange opened, while it is still open.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        if !self.streaming.is_open {
            return None;
        }
        self.streaming
            .opened_at
            .map(|opened| now.saturating_duration_since(opened))
    }

    /// Append one reasoning chunk. Blank chunks are ignored.
    pub(crate) fn append_reasoning(&mut self, chunk: &str) -> bool {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            return false;
        }
        if !self.streaming.buffer.is_empty() {
            self.streaming.buffer.push('\n');
        }
        self.streaming.buffer.push_str(chunk);
        true
    }

    /// Close the exchange and collapse its reasoning panel. Returns how
    /// long it was open.
    pub(crate) fn close(&mut self, now: Instant) -> Option<Duration> {
        let opened_at = self.streaming.opened_at.take();
        self.streaming.is_open = false;
        self.streaming.is_expanded = false;
        opened_at.map(|t| now.saturating_duration_since(t))
    }

    /// Flip the reasoning panel. Only closed messages with reasoning can
    /// be toggled.
    pub(crate) fn toggle_expanded(&mut self) -> Option<bool> {
        if self.streaming.is_open || self.streaming.buffer.is_empty() {
            return None;
        }
        self.streaming.is_expanded = !self.streaming.is_expanded;
        Some(self.streaming.is_expanded)
    }
}

pub(crate) const WELCOME_ID: &str = "welcome";
