//! Hook points for analytics and other passive observers.
//!
//! Observers see what the session did; they cannot change it. Errors they
//! return are logged, and a panicking observer is contained.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lti_common::MessageId;
use tracing::{debug, warn};

pub type ObserverResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A request that passed admission and was sent.
#[derive(Debug, Clone)]
pub struct AdmittedRequest<'a> {
    pub message_id: &'a MessageId,
    pub text: &'a str,
    /// 1-based position of this question within the session.
    pub question_number: u32,
    pub remaining: u32,
    pub conversation_id: Option<&'a str>,
    pub at: DateTime<Utc>,
}

pub trait SessionObserver: Send {
    fn name(&self) -> &str {
        "observer"
    }

    fn session_started(&self, _at: DateTime<Utc>) -> ObserverResult {
        Ok(())
    }

    fn request_admitted(&self, _request: &AdmittedRequest<'_>) -> ObserverResult {
        Ok(())
    }

    fn exchange_resolved(
        &self,
        _exchange: &MessageId,
        _open_for: Option<Duration>,
    ) -> ObserverResult {
        Ok(())
    }

    fn exchange_failed(&self, _exchange: &MessageId) -> ObserverResult {
        Ok(())
    }
}

/// Logs every hook at debug level.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn name(&self) -> &str {
        "tracing"
    }

    fn session_started(&self, at: DateTime<Utc>) -> ObserverResult {
        debug!(at = %at.to_rfc3339(), "Session started");
        Ok(())
    }

    fn request_admitted(&self, request: &AdmittedRequest<'_>) -> ObserverResult {
        debug!(
            message_id = %request.message_id,
            length = request.text.chars().count(),
            question = request.question_number,
            remaining = request.remaining,
            conversation_id = request.conversation_id.unwrap_or("-"),
            at = %request.at.to_rfc3339(),
            "Message sent"
        );
        Ok(())
    }

    fn exchange_resolved(
        &self,
        exchange: &MessageId,
        open_for: Option<Duration>,
    ) -> ObserverResult {
        debug!(
            exchange = %exchange,
            open_ms = open_for.map(|d| d.as_millis() as u64).unwrap_or(0),
            "Exchange resolved"
        );
        Ok(())
    }

    fn exchange_failed(&self, exchange: &MessageId) -> ObserverResult {
        debug!(exchange = %exchange, "Exchange failed");
        Ok(())
    }
}

/// The observers attached to one controller.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn SessionObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Run `hook` on every observer, isolating failures.
    pub(crate) fn notify(&self, hook: &str, f: impl Fn(&dyn SessionObserver) -> ObserverResult) {
        for observer in &self.observers {
            match catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(observer = observer.name(), hook, error = %e, "Observer failed");
                }
                Err(_) => {
                    warn!(observer = observer.name(), hook, "Observer panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}
