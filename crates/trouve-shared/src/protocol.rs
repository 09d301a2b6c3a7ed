//! Wire shapes exchanged with the campus backend.
//!
//! The backend speaks JSON on both transports: message records on the REST
//! endpoints, and text frames of shape `{"type": ..., ...}` on the push
//! channel. Reply references and the deleted flag travel denormalized on the
//! record and are folded into the typed [`Message`] on conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageStatus, ReplyRef};

/// A message exactly as the backend serializes it, on REST and push alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub from_user: String,
    pub to_user: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_author: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl From<MessageRecord> for Message {
    fn from(rec: MessageRecord) -> Self {
        let status = if rec.is_deleted {
            MessageStatus::Deleted
        } else {
            MessageStatus::Confirmed
        };

        let reply = rec.reply_to.map(|to| ReplyRef {
            to,
            content: rec.reply_content.unwrap_or_default(),
            author: rec.reply_author.unwrap_or_default(),
        });

        Self {
            id: rec.id,
            from_user: rec.from_user,
            to_user: rec.to_user,
            content: rec.content,
            timestamp: rec.timestamp,
            is_read: rec.is_read,
            reply,
            status,
        }
    }
}

/// Server-to-client push frames.
///
/// `new_message` is the only frame this client acts on; anything else fails
/// to decode and is dropped by the connection manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushFrame {
    NewMessage { message: MessageRecord },
}

impl PushFrame {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Client-to-server frames. Only the keep-alive ping; the server consumes it
/// without a required response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
}

impl ClientFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_frame_decodes() {
        let raw = r#"{
            "type": "new_message",
            "message": {
                "id": "m42",
                "from_user": "bob",
                "to_user": "alice",
                "content": "found your keys",
                "timestamp": "2025-03-10T09:30:00Z",
                "is_read": false
            }
        }"#;

        let frame = PushFrame::from_json(raw).unwrap();
        let PushFrame::NewMessage { message } = frame;
        assert_eq!(message.id, "m42");
        assert_eq!(message.from_user, "bob");
        assert!(message.reply_to.is_none());
    }

    #[test]
    fn test_unknown_frame_type_is_error() {
        assert!(PushFrame::from_json(r#"{"type": "user_typing"}"#).is_err());
        assert!(PushFrame::from_json("not json at all").is_err());
    }

    #[test]
    fn test_ping_frame_shape() {
        let json = ClientFrame::Ping.to_json().unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_record_conversion_folds_reply_and_deleted() {
        let rec = MessageRecord {
            id: "m1".into(),
            from_user: "alice".into(),
            to_user: "bob".into(),
            content: "".into(),
            timestamp: Utc::now(),
            is_read: true,
            reply_to: Some("m0".into()),
            reply_content: Some("original".into()),
            reply_author: Some("bob".into()),
            is_deleted: true,
        };

        let msg: Message = rec.into();
        assert_eq!(msg.status, MessageStatus::Deleted);
        let reply = msg.reply.unwrap();
        assert_eq!(reply.to, "m0");
        assert_eq!(reply.author, "bob");
    }
}
