use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection to the assistant backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket endpoint of the assistant service.
    pub url: String,
    /// Reconnect attempts after an unexpected close (valid range: 0-20).
    pub max_retries: u32,
    /// Fixed delay between reconnect attempts in ms (valid range: 100-60000).
    pub retry_delay_ms: u32,
    /// Per-attempt connect timeout in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// Attach the user message id to outbound frames as `exchange_id`.
    pub send_exchange_id: bool,
}

impl ConnectionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.retry_delay_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".into(),
            max_retries: 3,
            retry_delay_ms: 2000,
            connect_timeout_secs: 15,
            send_exchange_id: false,
        }
    }
}
