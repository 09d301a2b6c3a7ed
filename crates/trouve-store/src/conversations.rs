//! Summarized conversation list for the session user.
//!
//! Kept fresh by a poll timer and opportunistic refreshes after sends, push
//! deliveries and read-marks; each refresh is a full replace. Read-marking
//! flips local state immediately so the UI sees its own write before the
//! next refresh reconciles against the server.

use trouve_shared::types::Conversation;

/// The conversation index.
#[derive(Debug, Default)]
pub struct ConversationIndex {
    conversations: Vec<Conversation>,
    /// Direct unread-message count as last reported by the backend. Takes
    /// precedence over the derived count for the badge outside the list.
    server_unread: Option<u32>,
}

impl ConversationIndex {
    /// Create a new, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole index with a fresh fetch.
    pub fn install(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    /// Record the backend's direct unread-message count.
    pub fn set_server_unread(&mut self, count: u32) {
        self.server_unread = Some(count);
    }

    /// Optimistically clear the unread indicator for the conversation with
    /// `username`, ahead of the next refresh. Returns false if no such
    /// conversation is indexed.
    pub fn mark_read(&mut self, username: &str) -> bool {
        match self
            .conversations
            .iter_mut()
            .find(|c| c.other_user.username == username)
        {
            Some(conv) => {
                conv.unread_count = 0;
                true
            }
            None => false,
        }
    }

    /// Unread badge count: the backend's direct count when one has been
    /// observed, otherwise the number of conversations with unread messages.
    /// The two may transiently disagree between polls; that is accepted.
    pub fn badge_count(&self) -> u32 {
        self.server_unread.unwrap_or_else(|| self.derived_unread())
    }

    /// Number of conversations currently carrying unread messages.
    pub fn derived_unread(&self) -> u32 {
        self.conversations.iter().filter(|c| c.has_unread()).count() as u32
    }

    /// Look up a conversation by the other party's username.
    pub fn get(&self, username: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.other_user.username == username)
    }

    /// Snapshot sorted by recency of the last message, newest first.
    /// Conversations without messages sort last. Ordering is applied here,
    /// at read time — it is not a property of the stored entities.
    pub fn snapshot(&self) -> Vec<Conversation> {
        let mut list = self.conversations.clone();
        list.sort_by(|a, b| {
            let ta = a.last_message.as_ref().map(|m| m.timestamp);
            let tb = b.last_message.as_ref().map(|m| m.timestamp);
            tb.cmp(&ta)
        });
        list
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, Utc};
    use trouve_shared::types::{LastMessage, UserProfile};

    fn conv(username: &str, unread: u32, age_mins: i64) -> Conversation {
        Conversation {
            id: format!("c-{username}"),
            other_user: UserProfile {
                username: username.into(),
                full_name: None,
                avatar_url: None,
            },
            last_message: Some(LastMessage {
                content: "hi".into(),
                timestamp: Utc::now() - Duration::minutes(age_mins),
                from_user: username.into(),
                is_read: unread == 0,
            }),
            unread_count: unread,
        }
    }

    #[test]
    fn test_mark_read_flips_synchronously() {
        let mut index = ConversationIndex::new();
        index.install(vec![conv("bob", 3, 1), conv("carol", 1, 5)]);
        assert_eq!(index.derived_unread(), 2);

        assert!(index.mark_read("bob"));
        assert_eq!(index.get("bob").unwrap().unread_count, 0);
        assert_eq!(index.derived_unread(), 1);

        assert!(!index.mark_read("nobody"));
    }

    #[test]
    fn test_badge_prefers_server_count() {
        let mut index = ConversationIndex::new();
        index.install(vec![conv("bob", 2, 1)]);
        assert_eq!(index.badge_count(), 1);

        // The backend counts messages, not conversations; its number wins.
        index.set_server_unread(2);
        assert_eq!(index.badge_count(), 2);
        assert_eq!(index.derived_unread(), 1);
    }

    #[test]
    fn test_snapshot_sorted_by_recency() {
        let mut index = ConversationIndex::new();
        let mut empty = conv("dave", 0, 0);
        empty.last_message = None;
        index.install(vec![conv("bob", 0, 60), empty, conv("carol", 0, 5)]);

        let ordered: Vec<String> = index
            .snapshot()
            .into_iter()
            .map(|c| c.other_user.username)
            .collect();
        assert_eq!(ordered, ["carol", "bob", "dave"]);
    }

    #[test]
    fn test_install_replaces_wholesale() {
        let mut index = ConversationIndex::new();
        index.install(vec![conv("bob", 1, 1)]);
        index.install(vec![]);
        assert!(index.is_empty());
        assert!(index.get("bob").is_none());
    }
}
