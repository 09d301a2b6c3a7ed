//! Events broadcast to UI subscribers.
//!
//! The UI renders from store snapshots; these events only say *that*
//! something changed (plus enough detail to toast a new message). Emission
//! never fails: a send with no live subscribers is simply dropped.

use tokio::sync::broadcast;

/// State-change events emitted by the chat client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The push channel came up or went down.
    ConnectionChanged { connected: bool },

    /// A message arrived over the push channel. `for_open_conversation` is
    /// true when the sender is the currently open peer, so the UI can decide
    /// between rendering in place and showing a toast.
    MessageReceived {
        from_user: String,
        content: String,
        for_open_conversation: bool,
    },

    /// The open conversation's message sequence changed.
    MessagesUpdated,

    /// The conversation index was refreshed or read-marked.
    ConversationsUpdated,

    /// The notification feed was refreshed or read-marked.
    NotificationsUpdated,

    /// The online-user roster was refreshed.
    OnlineUsersUpdated,
}

/// Broadcast `event`, ignoring the no-subscriber case.
pub(crate) fn emit(tx: &broadcast::Sender<ClientEvent>, event: ClientEvent) {
    let _ = tx.send(event);
}
