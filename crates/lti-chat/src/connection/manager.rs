//! Reconnect state machine.

use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    /// Retry budget exhausted. Only an explicit `connect()` leaves this state.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Fixed wait before each reconnect attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// What to do after a connection (or connection attempt) was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossOutcome {
    /// The event belongs to a connection that is no longer current.
    Stale,
    /// Wait `delay`, then report back with `on_retry_elapsed(generation)`.
    Retry {
        generation: u64,
        attempt: u32,
        delay: Duration,
    },
    /// Retry budget exhausted.
    Exhausted,
}

/// Tracks the single current connection.
///
/// Every connection attempt gets a new generation number. Transport
/// events carry the generation they belong to; events from any other
/// generation are ignored.
#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    policy: RetryPolicy,
    retries: u32,
    generation: u64,
    retry_pending: bool,
}

impl ConnectionManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: ConnectionState::Closed,
            policy,
            retries: 0,
            generation: 0,
            retry_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn ready(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Start a new connection attempt. Returns its generation, or `None`
    /// if a connection is already open or being opened.
    pub fn connect(&mut self) -> Option<u64> {
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => None,
            ConnectionState::Closed | ConnectionState::Failed => {
                self.generation += 1;
                self.state = ConnectionState::Connecting;
                self.retry_pending = false;
                Some(self.generation)
            }
        }
    }

    /// The attempt for `generation` succeeded. Returns `false` if the
    /// attempt is no longer wanted; the caller must then close it.
    pub fn on_opened(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            debug!(generation, current = self.generation, "ignoring stale open");
            return false;
        }
        self.state = ConnectionState::Open;
        self.retries = 0;
        true
    }

    /// The connection (or attempt) for `generation` closed or failed.
    pub fn on_lost(&mut self, generation: u64) -> LossOutcome {
        let live = matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        );
        if generation != self.generation || !live {
            return LossOutcome::Stale;
        }

        if self.retries < self.policy.max_retries {
            self.retries += 1;
            self.state = ConnectionState::Closed;
            self.retry_pending = true;
            LossOutcome::Retry {
                generation: self.generation,
                attempt: self.retries,
                delay: self.policy.delay,
            }
        } else {
            self.state = ConnectionState::Failed;
            LossOutcome::Exhausted
        }
    }

    /// The retry delay scheduled by `on_lost` has passed. Returns the
    /// generation of the new attempt, or `None` if the retry was
    /// cancelled in the meantime.
    pub fn on_retry_elapsed(&mut self, generation: u64) -> Option<u64> {
        if !self.retry_pending || generation != self.generation {
            return None;
        }
        self.connect()
    }

    /// Release the current connection. Returns the generation that must
    /// be closed, if one is live. Cancels any pending retry and clears
    /// the retry counter.
    pub fn teardown(&mut self) -> Option<u64> {
        let live = matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        );
        self.state = ConnectionState::Closed;
        self.retries = 0;
        self.retry_pending = false;
        live.then_some(self.generation)
    }
}
