//! Reconciling message log for the conversation currently open in the UI.
//!
//! Holds the definitive, order-preserving message sequence and merges three
//! producers without duplicates: optimistic local sends, their server
//! confirmations, and remote messages arriving over the push channel.
//! Insertion order defines display order; the log never re-sorts by
//! timestamp, matching the backend contract's observed behavior.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use trouve_shared::constants::TEMP_ID_PREFIX;
use trouve_shared::protocol::MessageRecord;
use trouve_shared::types::{Message, MessageStatus, ReplyRef};

/// The ordered message sequence for the open conversation.
#[derive(Debug)]
pub struct MessageLog {
    session_user: String,
    /// Other party of the open conversation, if any.
    peer: Option<String>,
    /// Bumped on every `open`; stale history loads carry an older value and
    /// are discarded on `install`.
    epoch: u64,
    messages: Vec<Message>,
}

impl MessageLog {
    /// Create an empty log for the given session user.
    pub fn new(session_user: &str) -> Self {
        Self {
            session_user: session_user.to_string(),
            peer: None,
            epoch: 0,
            messages: Vec::new(),
        }
    }

    /// Open the conversation with `peer`, clearing the sequence.
    ///
    /// Returns the new epoch token; pass it back to [`install`] so a fetch
    /// that resolves after another `open` cannot overwrite the newer
    /// conversation.
    ///
    /// [`install`]: MessageLog::install
    pub fn open(&mut self, peer: &str) -> u64 {
        self.peer = Some(peer.to_string());
        self.messages.clear();
        self.epoch += 1;
        self.epoch
    }

    /// The other party of the open conversation.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Replace the sequence with a fetched history, oldest first.
    ///
    /// Returns false (and changes nothing) if `epoch` is stale.
    pub fn install(&mut self, epoch: u64, history: Vec<MessageRecord>) -> bool {
        if epoch != self.epoch {
            debug!(stale = epoch, current = self.epoch, "Discarding stale history load");
            return false;
        }
        self.messages = history.into_iter().map(Message::from).collect();
        true
    }

    /// Append an optimistic pending entry for a message the session user is
    /// sending, and return it (its id is the temporary id to confirm or roll
    /// back with).
    ///
    /// The reply snippet is denormalized from the log at append time, as the
    /// backend does on its side. Returns `None` when no conversation is open.
    pub fn append_pending(&mut self, content: &str, reply_to: Option<&str>) -> Option<Message> {
        let peer = self.peer.clone()?;

        let reply = reply_to.and_then(|target| {
            self.messages.iter().find(|m| m.id == target).map(|m| ReplyRef {
                to: m.id.clone(),
                content: m.content.clone(),
                author: m.from_user.clone(),
            })
        });

        let message = Message {
            id: format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()),
            from_user: self.session_user.clone(),
            to_user: peer,
            content: content.to_string(),
            timestamp: Utc::now(),
            is_read: false,
            reply,
            status: MessageStatus::Pending,
        };

        self.messages.push(message.clone());
        Some(message)
    }

    /// Replace the pending entry `temp_id` in place with the authoritative
    /// record, preserving its position in the sequence.
    ///
    /// If the confirmed id is already present elsewhere (the push channel
    /// echoed the message first), the pending entry is removed instead so the
    /// id appears exactly once. Returns false if `temp_id` is unknown.
    pub fn confirm(&mut self, temp_id: &str, record: MessageRecord) -> bool {
        let Some(pos) = self.messages.iter().position(|m| m.id == temp_id) else {
            return false;
        };

        let already_present = self
            .messages
            .iter()
            .enumerate()
            .any(|(i, m)| i != pos && m.id == record.id);

        if already_present {
            debug!(id = %record.id, "Confirmed message already delivered via push; dropping pending entry");
            self.messages.remove(pos);
        } else {
            self.messages[pos] = Message::from(record);
        }
        true
    }

    /// Remove the pending entry `temp_id` after a failed send. No error
    /// artifact is retained; the user resubmits.
    pub fn rollback(&mut self, temp_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != temp_id);
        self.messages.len() != before
    }

    /// Merge a message delivered over the push channel.
    ///
    /// Appends only if the record belongs to the open conversation and its id
    /// is not already present. This is the sole mutation path for messages
    /// authored by the remote party. Returns whether the sequence changed.
    pub fn apply_push(&mut self, record: MessageRecord) -> bool {
        let Some(peer) = self.peer.as_deref() else {
            return false;
        };
        if record.from_user != peer && record.to_user != peer {
            return false;
        }
        if self.messages.iter().any(|m| m.id == record.id) {
            debug!(id = %record.id, "Duplicate push message suppressed");
            return false;
        }

        self.messages.push(Message::from(record));
        true
    }

    /// Remove a message outright after the server accepted its retraction.
    ///
    /// This is the path for deleting one's own live message; history entries
    /// the *server* already marked deleted stay in the sequence as tombstones
    /// ([`MessageStatus::Deleted`]) and are never removed here.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Snapshot of the sequence in display order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, from: &str, to: &str, content: &str) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            from_user: from.into(),
            to_user: to.into(),
            content: content.into(),
            timestamp: Utc::now(),
            is_read: false,
            reply_to: None,
            reply_content: None,
            reply_author: None,
            is_deleted: false,
        }
    }

    #[test]
    fn test_send_confirm_keeps_position() {
        let mut log = MessageLog::new("alice");
        let epoch = log.open("bob");
        assert!(log.install(
            epoch,
            vec![record("m1", "bob", "alice", "hi"), record("m2", "alice", "bob", "hey")],
        ));

        let pending = log.append_pending("found your keys", None).unwrap();
        assert!(pending.id.starts_with(TEMP_ID_PREFIX));
        assert_eq!(log.len(), 3);

        // A remote message lands while the send is in flight.
        assert!(log.apply_push(record("m3", "bob", "alice", "really?")));

        assert!(log.confirm(&pending.id, record("m4", "alice", "bob", "found your keys")));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 4);
        // Replacement is in place: index 2, not appended after m3.
        assert_eq!(snapshot[2].id, "m4");
        assert_eq!(snapshot[2].status, MessageStatus::Confirmed);
        assert_eq!(snapshot[3].id, "m3");
    }

    #[test]
    fn test_rollback_removes_only_pending_entry() {
        let mut log = MessageLog::new("alice");
        let epoch = log.open("bob");
        assert!(log.install(epoch, vec![record("m1", "bob", "alice", "hi")]));

        let pending = log.append_pending("oops", None).unwrap();
        assert_eq!(log.len(), 2);

        assert!(log.rollback(&pending.id));
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "m1");

        // Second rollback is a no-op.
        assert!(!log.rollback(&pending.id));
    }

    #[test]
    fn test_push_echo_before_confirm_yields_single_entry() {
        let mut log = MessageLog::new("alice");
        log.open("bob");

        let pending = log.append_pending("hello", None).unwrap();

        // Same logical message echoed over the push channel before the REST
        // confirmation resolves.
        assert!(log.apply_push(record("m1", "alice", "bob", "hello")));
        assert!(log.confirm(&pending.id, record("m1", "alice", "bob", "hello")));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "m1");
    }

    #[test]
    fn test_push_duplicate_and_foreign_conversation_ignored() {
        let mut log = MessageLog::new("alice");
        let epoch = log.open("bob");
        assert!(log.install(epoch, vec![record("m1", "bob", "alice", "hi")]));

        assert!(!log.apply_push(record("m1", "bob", "alice", "hi")));
        assert!(!log.apply_push(record("m9", "carol", "alice", "unrelated")));
        assert_eq!(log.len(), 1);

        // Own message addressed to the open peer (e.g. echoed from another
        // tab) does belong.
        assert!(log.apply_push(record("m2", "alice", "bob", "from other tab")));
    }

    #[test]
    fn test_stale_install_is_discarded() {
        let mut log = MessageLog::new("alice");
        let epoch_a = log.open("bob");
        let epoch_b = log.open("carol");

        // Conversation A's fetch resolves late.
        assert!(!log.install(epoch_a, vec![record("a1", "bob", "alice", "old")]));
        assert!(log.is_empty());

        assert!(log.install(epoch_b, vec![record("c1", "carol", "alice", "new")]));
        assert_eq!(log.snapshot()[0].id, "c1");
        assert_eq!(log.peer(), Some("carol"));
    }

    #[test]
    fn test_reply_snippet_denormalized_from_log() {
        let mut log = MessageLog::new("alice");
        let epoch = log.open("bob");
        assert!(log.install(epoch, vec![record("m1", "bob", "alice", "is this yours?")]));

        let pending = log.append_pending("yes!", Some("m1")).unwrap();
        let reply = pending.reply.unwrap();
        assert_eq!(reply.to, "m1");
        assert_eq!(reply.content, "is this yours?");
        assert_eq!(reply.author, "bob");

        // Unknown target: message goes out without a reply reference.
        let plain = log.append_pending("hm", Some("nope")).unwrap();
        assert!(plain.reply.is_none());
    }

    #[test]
    fn test_tombstones_survive_local_delete_path() {
        let mut log = MessageLog::new("alice");
        let epoch = log.open("bob");

        let mut deleted = record("m1", "bob", "alice", "gone");
        deleted.is_deleted = true;
        assert!(log.install(epoch, vec![deleted, record("m2", "alice", "bob", "mine")]));

        // Server-marked deletion renders as a tombstone and stays put.
        assert_eq!(log.snapshot()[0].status, MessageStatus::Deleted);

        // Deleting one's own live message removes it outright.
        assert!(log.remove("m2"));
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "m1");
    }

    #[test]
    fn test_no_pending_without_open_conversation() {
        let mut log = MessageLog::new("alice");
        assert!(log.append_pending("hello?", None).is_none());
        assert!(log.is_empty());
    }
}
