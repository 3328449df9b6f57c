//! Session state: the message log, conversation identity, and quota.
//!
//! The open exchange is not stored separately. It is the newest user
//! message whose streaming state is open, and every lookup scans the log
//! from the end. Admission refuses a second exchange while one is open,
//! so at most one such message exists.

use std::time::{Duration, Instant};

use lti_common::MessageId;

use crate::message::Message;

/// Shown in place of backend error details.
pub const APOLOGY: &str = "Sorry, there was an error processing your request. Please try again.";

/// Outcome of closing an exchange.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The user message whose exchange was closed.
    pub exchange: MessageId,
    /// The assistant message appended in response.
    pub reply: Message,
    /// How long the exchange was open.
    pub open_for: Option<Duration>,
    /// Set when this resolution established the conversation id.
    pub adopted_conversation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    messages: Vec<Message>,
    conversation_id: Option<String>,
    question_count: u32,
    quota_max: u32,
    welcome: String,
    limit_notice_visible: bool,
}

impl SessionState {
    pub fn new(quota_max: u32, welcome: impl Into<String>) -> Self {
        let welcome = welcome.into();
        Self {
            messages: vec![Message::welcome(welcome.clone())],
            conversation_id: None,
            question_count: 0,
            quota_max,
            welcome,
            limit_notice_visible: false,
        }
    }

    /// Replace the log with a fresh welcome message and clear identity,
    /// quota usage, and notices.
    pub fn reset(&mut self) {
        self.messages = vec![Message::welcome(self.welcome.clone())];
        self.conversation_id = None;
        self.question_count = 0;
        self.limit_notice_visible = false;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn quota_max(&self) -> u32 {
        self.quota_max
    }

    pub fn remaining_questions(&self) -> u32 {
        self.quota_max.saturating_sub(self.question_count)
    }

    pub fn is_limit_reached(&self) -> bool {
        self.question_count >= self.quota_max
    }

    pub fn limit_notice_visible(&self) -> bool {
        self.limit_notice_visible
    }

    /// Hide the limit notice. Returns whether it was showing.
    pub fn dismiss_limit_notice(&mut self) -> bool {
        std::mem::replace(&mut self.limit_notice_visible, false)
    }

    pub fn open_exchange(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_open())
    }

    fn open_exchange_mut(&mut self) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| m.is_open())
    }

    pub fn has_open_exchange(&self) -> bool {
        self.open_exchange().is_some()
    }

    /// Record an admitted request: append the user message with an open
    /// exchange and count the question.
    pub(crate) fn begin_exchange(&mut self, text: String, now: Instant) -> &Message {
        self.question_count += 1;
        if self.is_limit_reached() {
            self.limit_notice_visible = true;
        }
        self.messages.push(Message::opening(text, now));
        &self.messages[self.messages.len() - 1]
    }

    /// Append reasoning to the open exchange. Returns the updated message,
    /// or `None` if no exchange is open.
    pub(crate) fn append_reasoning(&mut self, chunk: &str) -> Option<&Message> {
        let open = self.open_exchange_mut()?;
        open.append_reasoning(chunk);
        Some(&*open)
    }

    /// Close the open exchange with the assistant's answer.
    ///
    /// The conversation id is adopted only if none is set yet. Without an
    /// open exchange nothing changes.
    pub(crate) fn resolve_final(
        &mut self,
        content: String,
        conversation_id: Option<String>,
        now: Instant,
    ) -> Option<Resolution> {
        let open = self.open_exchange_mut()?;
        let exchange = open.id().clone();
        let open_for = open.close(now);

        let adopted_conversation = match (&self.conversation_id, conversation_id) {
            (None, Some(id)) => {
                self.conversation_id = Some(id.clone());
                Some(id)
            }
            _ => None,
        };

        let reply = Message::assistant(content);
        self.messages.push(reply.clone());
        Some(Resolution {
            exchange,
            reply,
            open_for,
            adopted_conversation,
        })
    }

    /// Close the open exchange with the fixed apology.
    pub(crate) fn resolve_error(&mut self, now: Instant) -> Option<Resolution> {
        let open = self.open_exchange_mut()?;
        let exchange = open.id().clone();
        let open_for = open.close(now);

        let reply = Message::assistant(APOLOGY.to_string());
        self.messages.push(reply.clone());
        Some(Resolution {
            exchange,
            reply,
            open_for,
            adopted_conversation: None,
        })
    }

    /// Append the apology without closing anything. Used for an error
    /// that arrives while no exchange is open.
    pub(crate) fn append_apology(&mut self) -> Message {
        let reply = Message::assistant(APOLOGY.to_string());
        self.messages.push(reply.clone());
        reply
    }

    /// Flip the reasoning panel of a closed message.
    pub(crate) fn toggle_reasoning(&mut self, id: &MessageId) -> Option<bool> {
        self.messages
            .iter_mut()
            .find(|m| m.id() == id)
            .and_then(|m| m.toggle_expanded())
    }
}
