//! The driver task: owns the controller and performs its effects.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use lti_common::{MessageId, Rejection, TransportError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::connection::{Connector, Link, LinkEvent};
use crate::controller::{ChatController, ChatUpdate, Effect, SessionSnapshot};

/// Period of the elapsed-time display tick.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

type AttemptResult = (u64, Result<Link, TransportError>);

/// Requests from [`ChatHandle`](super::ChatHandle) to the driver.
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<Result<MessageId, Rejection>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    ToggleReasoning {
        id: MessageId,
        reply: oneshot::Sender<Option<bool>>,
    },
    DismissLimitNotice,
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Whatever woke the driver loop.
enum Wake {
    Command(Option<Command>),
    Attempt(AttemptResult),
    Link(u64, Option<LinkEvent>),
    Retry(u64),
    Tick,
}

pub(crate) struct Driver {
    controller: ChatController,
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    updates: mpsc::Sender<ChatUpdate>,
    /// The open link and the generation it belongs to.
    link: Option<(u64, Link)>,
    /// The in-flight connect attempt.
    attempt: Option<(u64, JoinHandle<()>)>,
    attempts_tx: mpsc::Sender<AttemptResult>,
    attempts_rx: mpsc::Receiver<AttemptResult>,
    /// The pending retry timer.
    retry: Option<(u64, Pin<Box<Sleep>>)>,
}

impl Driver {
    pub(crate) fn new(
        controller: ChatController,
        connector: Arc<dyn Connector>,
        connect_timeout: Duration,
        updates: mpsc::Sender<ChatUpdate>,
    ) -> Self {
        let (attempts_tx, attempts_rx) = mpsc::channel(4);
        Self {
            controller,
            connector,
            connect_timeout,
            updates,
            link: None,
            attempt: None,
            attempts_tx,
            attempts_rx,
            retry: None,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.controller.start();
        self.apply_effects().await;

        let mut ticker = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let mut ack = None;
            let wake = tokio::select! {
                command = commands.recv() => Wake::Command(command),
                Some(result) = self.attempts_rx.recv() => Wake::Attempt(result),
                (generation, event) = next_link_event(&mut self.link) => {
                    Wake::Link(generation, event)
                }
                generation = retry_elapsed(&mut self.retry) => Wake::Retry(generation),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Command(None) => {
                    debug!("All chat handles dropped");
                    self.controller.shutdown();
                    self.apply_effects().await;
                    break;
                }
                Wake::Command(Some(Command::Shutdown { reply })) => {
                    self.controller.shutdown();
                    self.apply_effects().await;
                    let _ = reply.send(());
                    break;
                }
                Wake::Command(Some(command)) => ack = self.handle_command(command),
                Wake::Attempt((generation, result)) => {
                    self.handle_attempt(generation, result).await
                }
                Wake::Link(generation, event) => self.handle_link_event(generation, event),
                Wake::Retry(generation) => {
                    self.retry = None;
                    self.controller.on_retry_elapsed(generation);
                }
                Wake::Tick => self.controller.tick(),
            }

            self.apply_effects().await;
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        }

        if let Some((_, attempt)) = self.attempt.take() {
            attempt.abort();
        }
        info!("Chat driver stopped");
    }

    /// Run one command. Returns the acknowledgement to send once the
    /// resulting effects have been performed.
    fn handle_command(&mut self, command: Command) -> Option<oneshot::Sender<()>> {
        match command {
            Command::Submit { text, reply } => {
                let _ = reply.send(self.controller.submit(&text));
            }
            Command::Reset { reply } => {
                self.controller.reset();
                return Some(reply);
            }
            Command::ToggleReasoning { id, reply } => {
                let _ = reply.send(self.controller.toggle_reasoning(&id));
            }
            Command::DismissLimitNotice => self.controller.dismiss_limit_notice(),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.controller.snapshot());
            }
            Command::Shutdown { .. } => {}
        }
        None
    }

    async fn handle_attempt(&mut self, generation: u64, result: Result<Link, TransportError>) {
        if self.attempt.as_ref().is_some_and(|(g, _)| *g == generation) {
            self.attempt = None;
        }

        match result {
            Ok(link) => {
                if self.controller.on_connected(generation) {
                    if let Some((old, stale)) = self.link.replace((generation, link)) {
                        debug!(generation = old, "Replacing stale link");
                        stale.close().await;
                    }
                } else {
                    debug!(generation, "Closing unwanted link");
                    link.close().await;
                }
            }
            Err(e) => {
                warn!(generation, error = %e, "Connect attempt failed");
                self.controller
                    .on_connection_lost(generation, &e.to_string());
            }
        }
    }

    fn handle_link_event(&mut self, generation: u64, event: Option<LinkEvent>) {
        match event {
            Some(LinkEvent::Frame(raw)) => self.controller.on_frame(generation, &raw),
            Some(LinkEvent::Closed(reason)) => {
                self.link = None;
                self.controller.on_connection_lost(generation, &reason);
            }
            None => {
                self.link = None;
                self.controller
                    .on_connection_lost(generation, "link pump stopped");
            }
        }
    }

    /// Perform effects until the controller records no more.
    async fn apply_effects(&mut self) {
        loop {
            let effects = self.controller.drain_effects();
            if effects.is_empty() {
                return;
            }
            for effect in effects {
                self.apply(effect).await;
            }
        }
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Connect { generation } => self.spawn_attempt(generation),
            Effect::Send {
                generation,
                payload,
            } => {
                let sent = match &self.link {
                    Some((g, link)) if *g == generation => link.send(payload).await,
                    _ => Err(TransportError::Closed("no open link".into())),
                };
                if let Err(e) = sent {
                    warn!(generation, error = %e, "Send failed");
                    if self.link.as_ref().is_some_and(|(g, _)| *g == generation) {
                        self.link = None;
                    }
                    self.controller
                        .on_connection_lost(generation, &e.to_string());
                }
            }
            Effect::Close { generation } => {
                if self.link.as_ref().is_some_and(|(g, _)| *g == generation) {
                    if let Some((_, link)) = self.link.take() {
                        link.close().await;
                    }
                }
                if self.attempt.as_ref().is_some_and(|(g, _)| *g == generation) {
                    if let Some((_, attempt)) = self.attempt.take() {
                        attempt.abort();
                    }
                }
                if self.retry.as_ref().is_some_and(|(g, _)| *g == generation) {
                    self.retry = None;
                }
            }
            Effect::ScheduleRetry { generation, delay } => {
                self.retry = Some((generation, Box::pin(tokio::time::sleep(delay))));
            }
            Effect::Emit(update) => {
                if self.updates.send(update).await.is_err() {
                    debug!("Update receiver dropped");
                }
            }
        }
    }

    fn spawn_attempt(&mut self, generation: u64) {
        if let Some((old, attempt)) = self.attempt.take() {
            debug!(generation = old, "Abandoning connect attempt");
            attempt.abort();
        }

        let connector = Arc::clone(&self.connector);
        let timeout = self.connect_timeout;
        let attempts = self.attempts_tx.clone();
        let handle = tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            let _ = attempts.send((generation, result)).await;
        });
        self.attempt = Some((generation, handle));
    }
}

async fn next_link_event(link: &mut Option<(u64, Link)>) -> (u64, Option<LinkEvent>) {
    match link {
        Some((generation, link)) => (*generation, link.recv().await),
        None => pending().await,
    }
}

async fn retry_elapsed(retry: &mut Option<(u64, Pin<Box<Sleep>>)>) -> u64 {
    match retry {
        Some((generation, sleep)) => {
            sleep.as_mut().await;
            *generation
        }
        None => pending().await,
    }
}
