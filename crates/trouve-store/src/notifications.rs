//! System notification feed: the structural sibling of the conversation
//! index, tracking its own unread counter for comment/message/moderation/
//! contact events. Same full-replace refresh and optimistic read-flip
//! pattern.

use trouve_shared::types::Notification;

/// The notification feed.
#[derive(Debug, Default)]
pub struct NotificationFeed {
    notifications: Vec<Notification>,
    /// Direct unread count as last reported by the backend.
    server_unread: Option<u32>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole feed with a fresh fetch.
    pub fn install(&mut self, notifications: Vec<Notification>) {
        self.notifications = notifications;
    }

    /// Record the backend's direct unread count.
    pub fn set_server_unread(&mut self, count: u32) {
        self.server_unread = Some(count);
    }

    /// Optimistically flip one notification to read and decrement the
    /// counter, ahead of the next refresh. Returns false for unknown ids.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                if let Some(count) = &mut self.server_unread {
                    *count = count.saturating_sub(1);
                }
                true
            }
            Some(_) => true, // already read; idempotent
            None => false,
        }
    }

    /// Optimistically flip every notification to read.
    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.is_read = true;
        }
        if let Some(count) = &mut self.server_unread {
            *count = 0;
        }
    }

    /// Unread badge count, with the backend's direct count taking precedence
    /// over the derived one.
    pub fn badge_count(&self) -> u32 {
        self.server_unread.unwrap_or_else(|| self.derived_unread())
    }

    /// Number of unread notifications currently in the feed.
    pub fn derived_unread(&self) -> u32 {
        self.notifications.iter().filter(|n| !n.is_read).count() as u32
    }

    /// Snapshot in server order (newest first as served).
    pub fn snapshot(&self) -> Vec<Notification> {
        self.notifications.clone()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}
