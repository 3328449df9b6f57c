//! Wire frames exchanged with the assistant service.
//!
//! Inbound frames are a JSON tagged union on `type`. Anything that does
//! not decode into one of the known variants is a [`ProtocolError`]; the
//! caller logs it and moves on.

use lti_common::ProtocolError;
use serde::{Deserialize, Serialize};

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    /// Incremental reasoning text for the open exchange.
    Thinking {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exchange_id: Option<String>,
    },
    /// The assistant's answer; closes the exchange.
    Final {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exchange_id: Option<String>,
    },
    /// The exchange failed. `content` is diagnostic only.
    Error {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exchange_id: Option<String>,
    },
}

impl InboundFrame {
    /// Exchange the server says this frame belongs to, if it says at all.
    pub fn exchange_id(&self) -> Option<&str> {
        match self {
            InboundFrame::Thinking { exchange_id, .. }
            | InboundFrame::Final { exchange_id, .. }
            | InboundFrame::Error { exchange_id, .. } => exchange_id.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundFrame::Thinking { .. } => "thinking",
            InboundFrame::Final { .. } => "final",
            InboundFrame::Error { .. } => "error",
        }
    }
}

/// A request sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<String>,
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

/// Decode one raw inbound payload.
pub fn decode_frame(raw: &str) -> Result<InboundFrame, ProtocolError> {
    serde_json::from_str(raw).map_err(|e| ProtocolError::Decode(e.to_string()))
}
