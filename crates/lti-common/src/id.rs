use serde::{Deserialize, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Identifier of a message in the session log.
///
/// Doubles as the exchange identifier for user messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(new_id())
    }

    /// Build an id from a fixed token, e.g. the welcome message.
    pub fn from_static(token: &str) -> Self {
        Self(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn from_static_keeps_token() {
        let id = MessageId::from_static("welcome");
        assert_eq!(id.as_str(), "welcome");
        assert_eq!(id.to_string(), "welcome");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = MessageId::from_static("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: MessageId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
