use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user's runtime identity and credential.
///
/// Created by the auth layer on login and handed to the client; at most one
/// session is live per running client, and the push channel may only exist
/// while a session does.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique account name, used to address the push channel.
    pub username: String,
    /// Human-readable name shown in conversation headers.
    pub display_name: String,
    /// Bearer credential attached to every request.
    pub token: String,
    /// Avatar path relative to the backend, if the user set one.
    pub avatar_url: Option<String>,
}

/// Lifecycle status of a message held in the local log.
///
/// An explicit enum rather than `is_temp`/`is_deleted` flags, so a message
/// can never be pending and deleted at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Optimistic local entry with a temporary id, awaiting confirmation.
    Pending,
    /// Server-confirmed entry with an authoritative id and timestamp.
    Confirmed,
    /// Retracted server-side; rendered as a tombstone, content hidden.
    Deleted,
}

/// Reference to the message a reply targets, with the target's content and
/// author denormalized so the bubble renders without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    /// Id of the message being replied to.
    pub to: String,
    /// Snippet of the target's content at reply time.
    pub content: String,
    /// Username of the target's author.
    pub author: String,
}

/// A single direct message as held by the local log.
#[derive(Debug, Clone)]
pub struct Message {
    /// Server-assigned id, or a `temp-` id while [`MessageStatus::Pending`].
    pub id: String,
    pub from_user: String,
    pub to_user: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub reply: Option<ReplyRef>,
    pub status: MessageStatus,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }

    pub fn is_deleted(&self) -> bool {
        self.status == MessageStatus::Deleted
    }

    /// The conversation partner from this session's point of view.
    pub fn other_party<'a>(&'a self, session_user: &str) -> &'a str {
        if self.from_user == session_user {
            &self.to_user
        } else {
            &self.from_user
        }
    }
}

/// Public profile of a conversation partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

/// Denormalized summary of the most recent message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub from_user: String,
    #[serde(default)]
    pub is_read: bool,
}

/// Summary of one two-party conversation, as served in bulk by the backend.
///
/// Conversations materialize server-side when two users first exchange a
/// message; the client never creates one locally. Ordering is not a property
/// of the entity — the index sorts by recency at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub other_user: UserProfile,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

/// Category of a system notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CommentReply,
    NewMessage,
    Moderation,
    ContactInterest,
    /// Forward compatibility: kinds this client version does not know.
    #[serde(other)]
    Other,
}

/// A server-generated event record. Created server-side only; the client
/// only ever flips `is_read` from false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub related_post_id: Option<String>,
    #[serde(default)]
    pub related_user: Option<String>,
    pub created_at: DateTime<Utc>,
}
