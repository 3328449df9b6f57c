//! Controller implementation.

use std::sync::Arc;

use chrono::Utc;
use lti_common::{MessageId, Rejection};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::connection::{ConnectionManager, ConnectionState, LossOutcome};
use crate::gate;
use crate::observer::{AdmittedRequest, ObserverSet, SessionObserver};
use crate::protocol::{self, InboundFrame, OutboundFrame};
use crate::session::{Resolution, SessionState};

use super::types::{ChatOptions, ChatUpdate, Effect, Notice, SessionSnapshot};

pub struct ChatController {
    session: SessionState,
    connection: ConnectionManager,
    clock: Arc<dyn Clock>,
    observers: ObserverSet,
    send_exchange_id: bool,
    effects: Vec<Effect>,
    /// Last elapsed value emitted for the open exchange.
    shown_elapsed: Option<u64>,
}

impl ChatController {
    pub fn new(options: &ChatOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            session: SessionState::new(options.quota_max, options.welcome_message.clone()),
            connection: ConnectionManager::new(options.retry),
            clock,
            observers: ObserverSet::new(),
            send_exchange_id: options.send_exchange_id,
            effects: Vec::new(),
            shown_elapsed: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn ready(&self) -> bool {
        self.connection.ready()
    }

    pub fn generation(&self) -> u64 {
        self.connection.generation()
    }

    /// Take the effects recorded since the last call, oldest first.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.session.messages().to_vec(),
            conversation_id: self.session.conversation_id().map(str::to_owned),
            question_count: self.session.question_count(),
            remaining_questions: self.session.remaining_questions(),
            quota_max: self.session.quota_max(),
            connection: self.connection.state(),
            limit_notice_visible: self.session.limit_notice_visible(),
        }
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Begin the session: announce it and open the first connection.
    pub fn start(&mut self) {
        self.observers
            .notify("session_started", |o| o.session_started(Utc::now()));
        self.emit_quota();
        self.connect();
    }

    /// Run admission for `text` and, if admitted, send it.
    ///
    /// Rejections leave the session untouched and are also surfaced as a
    /// notice.
    pub fn submit(&mut self, text: &str) -> Result<MessageId, Rejection> {
        let text = match gate::admit(self.connection.ready(), &self.session, text) {
            Ok(text) => text.to_owned(),
            Err(rejection) => {
                self.reject(rejection);
                return Err(rejection);
            }
        };

        let now = self.clock.now();
        let conversation_id = self.session.conversation_id().map(str::to_owned);
        let message = self.session.begin_exchange(text, now).clone();
        let id = message.id().clone();
        self.shown_elapsed = None;

        let frame = OutboundFrame {
            message: message.content().to_owned(),
            conversation_id: conversation_id.clone(),
            exchange_id: self.send_exchange_id.then(|| id.to_string()),
        };

        self.emit(ChatUpdate::MessageAppended(message.clone()));
        self.emit_quota();
        if self.session.is_limit_reached() {
            self.emit(ChatUpdate::Notice(Notice::QuotaReached));
        }

        match frame.encode() {
            Ok(payload) => self.effects.push(Effect::Send {
                generation: self.connection.generation(),
                payload,
            }),
            Err(e) => {
                error!(error = %e, "Failed to encode request");
                self.abort_open_exchange("request could not be encoded");
            }
        }

        let request = AdmittedRequest {
            message_id: &id,
            text: message.content(),
            question_number: self.session.question_count(),
            remaining: self.session.remaining_questions(),
            conversation_id: conversation_id.as_deref(),
            at: Utc::now(),
        };
        self.observers
            .notify("request_admitted", |o| o.request_admitted(&request));

        Ok(id)
    }

    /// Start over: new log, no conversation, zero questions, and a fresh
    /// connection so nothing from the old session can leak in.
    pub fn reset(&mut self) {
        info!(
            questions = self.session.question_count(),
            "Starting a new session"
        );
        if let Some(generation) = self.connection.teardown() {
            self.effects.push(Effect::Close { generation });
        }
        self.session.reset();
        self.shown_elapsed = None;
        self.emit(ChatUpdate::SessionReset {
            messages: self.session.messages().to_vec(),
        });
        self.start();
    }

    pub fn toggle_reasoning(&mut self, id: &MessageId) -> Option<bool> {
        let expanded = self.session.toggle_reasoning(id)?;
        self.emit(ChatUpdate::ReasoningToggled {
            id: id.clone(),
            expanded,
        });
        Some(expanded)
    }

    pub fn dismiss_limit_notice(&mut self) {
        if self.session.dismiss_limit_notice() {
            self.emit(ChatUpdate::NoticeCleared(Notice::QuotaReached));
        }
    }

    /// Periodic display tick: report elapsed whole seconds of the open
    /// exchange when the value changes.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let open = self
            .session
            .open_exchange()
            .and_then(|m| m.elapsed(now).map(|d| (m.id().clone(), d.as_secs())));

        match open {
            Some((id, seconds)) if self.shown_elapsed != Some(seconds) => {
                self.shown_elapsed = Some(seconds);
                self.emit(ChatUpdate::Elapsed { id, seconds });
            }
            Some(_) => {}
            None => self.shown_elapsed = None,
        }
    }

    /// Release the connection for good.
    pub fn shutdown(&mut self) {
        if let Some(generation) = self.connection.teardown() {
            self.effects.push(Effect::Close { generation });
        }
        self.emit(ChatUpdate::ConnectionChanged(ConnectionState::Closed));
    }

    // -----------------------------------------------------------------------
    // Transport events
    // -----------------------------------------------------------------------

    /// The attempt for `generation` connected. Returns `false` if that
    /// connection is not wanted anymore and should be closed.
    pub fn on_connected(&mut self, generation: u64) -> bool {
        if !self.connection.on_opened(generation) {
            return false;
        }
        info!(generation, "Connected to assistant service");
        self.emit(ChatUpdate::ConnectionChanged(ConnectionState::Open));
        true
    }

    pub fn on_connection_lost(&mut self, generation: u64, reason: &str) {
        match self.connection.on_lost(generation) {
            LossOutcome::Stale => {
                debug!(generation, reason, "Ignoring loss of stale connection");
            }
            LossOutcome::Retry {
                generation,
                attempt,
                delay,
            } => {
                info!(
                    generation,
                    attempt,
                    max_retries = self.connection.policy().max_retries,
                    delay_ms = delay.as_millis() as u64,
                    reason,
                    "Connection lost, retrying"
                );
                self.abort_open_exchange("connection lost");
                self.emit(ChatUpdate::ConnectionChanged(ConnectionState::Closed));
                self.effects.push(Effect::ScheduleRetry { generation, delay });
            }
            LossOutcome::Exhausted => {
                error!(generation, reason, "Connection lost, giving up");
                self.abort_open_exchange("connection lost");
                self.emit(ChatUpdate::ConnectionChanged(ConnectionState::Failed));
                self.emit(ChatUpdate::Notice(Notice::ConnectivityFailed));
            }
        }
    }

    pub fn on_retry_elapsed(&mut self, generation: u64) {
        match self.connection.on_retry_elapsed(generation) {
            Some(next) => self.begin_connect(next),
            None => debug!(generation, "Retry no longer wanted"),
        }
    }

    /// Handle one raw inbound payload from the connection of `generation`.
    pub fn on_frame(&mut self, generation: u64, raw: &str) {
        if generation != self.connection.generation() || !self.connection.ready() {
            debug!(generation, "Dropping frame from stale connection");
            return;
        }

        let frame = match protocol::decode_frame(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = raw.len(), "Dropping malformed frame");
                return;
            }
        };

        if let (Some(claimed), Some(open)) = (frame.exchange_id(), self.session.open_exchange()) {
            if claimed != open.id().as_str() {
                debug!(
                    claimed,
                    open = %open.id(),
                    kind = frame.kind(),
                    "Dropping frame for another exchange"
                );
                return;
            }
        }

        match frame {
            InboundFrame::Thinking { content, .. } => {
                let update = self.session.append_reasoning(&content).map(|m| {
                    ChatUpdate::ReasoningUpdated {
                        id: m.id().clone(),
                        reasoning: m.reasoning().to_owned(),
                    }
                });
                match update {
                    Some(update) => self.emit(update),
                    None => debug!("Thinking frame with no open exchange"),
                }
            }
            InboundFrame::Final {
                content,
                conversation_id,
                ..
            } => {
                let now = self.clock.now();
                match self.session.resolve_final(content, conversation_id, now) {
                    Some(resolution) => self.finish(resolution, true),
                    None => debug!("Final frame with no open exchange"),
                }
            }
            InboundFrame::Error { content, .. } => {
                warn!(detail = %content, "Assistant reported an error");
                let now = self.clock.now();
                match self.session.resolve_error(now) {
                    Some(resolution) => self.finish(resolution, false),
                    None => {
                        let reply = self.session.append_apology();
                        self.emit(ChatUpdate::MessageAppended(reply));
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn connect(&mut self) {
        if let Some(generation) = self.connection.connect() {
            self.begin_connect(generation);
        }
    }

    fn begin_connect(&mut self, generation: u64) {
        self.effects.push(Effect::Connect { generation });
        self.emit(ChatUpdate::ConnectionChanged(ConnectionState::Connecting));
        self.emit(ChatUpdate::Notice(Notice::Connecting));
    }

    fn reject(&mut self, rejection: Rejection) {
        debug!(%rejection, "Request rejected");
        let notice = match rejection {
            Rejection::EmptyRequest => return,
            Rejection::NotReady => Notice::NotReady,
            Rejection::QuotaReached => Notice::QuotaReached,
            Rejection::ExchangeOpen => Notice::ExchangeOpen,
        };
        self.emit(ChatUpdate::Notice(notice));
    }

    /// Close the open exchange, if any, as failed.
    fn abort_open_exchange(&mut self, reason: &str) {
        let now = self.clock.now();
        if let Some(resolution) = self.session.resolve_error(now) {
            warn!(exchange = %resolution.exchange, reason, "Exchange aborted");
            self.finish(resolution, false);
        }
    }

    fn finish(&mut self, resolution: Resolution, succeeded: bool) {
        self.shown_elapsed = None;
        let Resolution {
            exchange,
            reply,
            open_for,
            adopted_conversation,
        } = resolution;

        self.emit(ChatUpdate::ExchangeClosed {
            id: exchange.clone(),
        });
        if let Some(conversation_id) = adopted_conversation {
            info!(conversation_id = %conversation_id, "Conversation started");
            self.emit(ChatUpdate::ConversationStarted { conversation_id });
        }
        self.emit(ChatUpdate::MessageAppended(reply));

        if succeeded {
            self.observers
                .notify("exchange_resolved", |o| o.exchange_resolved(&exchange, open_for));
        } else {
            self.observers
                .notify("exchange_failed", |o| o.exchange_failed(&exchange));
        }
    }

    fn emit_quota(&mut self) {
        self.emit(ChatUpdate::QuotaChanged {
            used: self.session.question_count(),
            remaining: self.session.remaining_questions(),
            max: self.session.quota_max(),
        });
    }

    fn emit(&mut self, update: ChatUpdate) {
        self.effects.push(Effect::Emit(update));
    }
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("connection", &self.connection)
            .field("messages", &self.session.messages().len())
            .field("question_count", &self.session.question_count())
            .field("observers", &self.observers)
            .finish()
    }
}
