use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity attached to a connection, resolved from the session that
/// authenticated it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
}

/// One chat event as fanned out to every member of a room.
///
/// Immutable once constructed; the hub clones it per recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub sender_uuid: String,
    pub sender_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Tags a message body with the sending client's identity.
    pub fn new(sender: &UserIdentity, body: String) -> Self {
        Self {
            sender_uuid: sender.user_id.clone(),
            sender_name: sender.username.clone(),
            body,
            sent_at: Utc::now(),
        }
    }
}

/// Client-to-server wire frame. Anything beyond `body` is rejected at
/// decode time by serde's unknown-field handling being lenient - extra
/// fields are ignored, a missing body is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFrame {
    pub body: String,
}
