//! The aggregate chat client.
//!
//! `ChatClient` wires the push channel into the stores, runs the fallback
//! polling timers, and exposes the operations the UI calls. Stores live
//! behind `Arc<Mutex<_>>`; guards are held only for the store call itself
//! and never across an await, so the mutex is an ordering boundary, not a
//! contention point.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use trouve_net::{spawn_push, ApiClient, ChannelState, PushCommand, PushConfig, PushEvent};
use trouve_shared::types::{Conversation, Message, Notification, Session};
use trouve_store::{ConversationIndex, MessageLog, NotificationFeed};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{emit, ClientEvent};

/// Chat client for one authenticated session.
///
/// Owns the single push channel, the stores and all timers. Dropping the
/// client (or calling [`shutdown`](ChatClient::shutdown)) releases them all;
/// no event is delivered afterwards.
pub struct ChatClient {
    session: Session,
    api: ApiClient,
    messages: Arc<Mutex<MessageLog>>,
    conversations: Arc<Mutex<ConversationIndex>>,
    notifications: Arc<Mutex<NotificationFeed>>,
    online_users: Arc<Mutex<Vec<String>>>,
    push_cmd_tx: mpsc::Sender<PushCommand>,
    event_tx: broadcast::Sender<ClientEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChatClient {
    /// Start the client: spawn the push channel, its bridge, and the two
    /// polling loops. Must be called inside a tokio runtime.
    pub fn start(session: Session, config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config.api_url, &session.token, config.request_timeout)?;

        let messages = Arc::new(Mutex::new(MessageLog::new(&session.username)));
        let conversations = Arc::new(Mutex::new(ConversationIndex::new()));
        let notifications = Arc::new(Mutex::new(NotificationFeed::new()));
        let online_users = Arc::new(Mutex::new(Vec::new()));
        let (event_tx, _) = broadcast::channel(64);

        let push_config = PushConfig {
            ws_url: config.ws_url.clone(),
            heartbeat_interval: config.heartbeat_interval,
            reconnect_delay: config.reconnect_delay,
        };
        let (push_cmd_tx, push_event_rx) = spawn_push(&session, push_config);

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(push_bridge(
            push_event_rx,
            api.clone(),
            session.username.clone(),
            messages.clone(),
            conversations.clone(),
            event_tx.clone(),
        )));
        tasks.push(tokio::spawn(conversation_poll_loop(
            api.clone(),
            conversations.clone(),
            online_users.clone(),
            event_tx.clone(),
            config.poll_interval,
        )));
        tasks.push(tokio::spawn(notification_poll_loop(
            api.clone(),
            notifications.clone(),
            event_tx.clone(),
            config.poll_interval,
        )));

        info!(user = %session.username, "Chat client started");

        Ok(Self {
            session,
            api,
            messages,
            conversations,
            notifications,
            online_users,
            push_cmd_tx,
            event_tx,
            tasks,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Subscribe to client events. Slow subscribers may observe lag; the
    /// stores always hold the authoritative snapshot.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Current lifecycle state of the push channel.
    pub async fn channel_state(&self) -> ChannelState {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self
            .push_cmd_tx
            .send(PushCommand::GetState(reply_tx))
            .await
            .is_err()
        {
            return ChannelState::Idle;
        }
        reply_rx.await.unwrap_or(ChannelState::Idle)
    }

    // -- snapshots -----------------------------------------------------

    /// Messages of the open conversation, in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|log| log.snapshot())
            .unwrap_or_default()
    }

    /// The other party of the open conversation, if any.
    pub fn open_peer(&self) -> Option<String> {
        self.messages
            .lock()
            .ok()
            .and_then(|log| log.peer().map(str::to_string))
    }

    /// Conversation summaries, newest activity first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.conversations
            .lock()
            .map(|index| index.snapshot())
            .unwrap_or_default()
    }

    /// Unread badge for direct messages.
    pub fn message_badge(&self) -> u32 {
        self.conversations
            .lock()
            .map(|index| index.badge_count())
            .unwrap_or(0)
    }

    /// Notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|feed| feed.snapshot())
            .unwrap_or_default()
    }

    /// Unread badge for notifications.
    pub fn notification_badge(&self) -> u32 {
        self.notifications
            .lock()
            .map(|feed| feed.badge_count())
            .unwrap_or(0)
    }

    /// Usernames currently online.
    pub fn online_users(&self) -> Vec<String> {
        self.online_users
            .lock()
            .map(|users| users.clone())
            .unwrap_or_default()
    }

    // -- operations ----------------------------------------------------

    /// Open the conversation with `peer`: clear the log, fetch the history,
    /// and mark the conversation read.
    ///
    /// A load that resolves after another `open_conversation` call is
    /// discarded via the log's epoch token, so a stale response can never
    /// overwrite the newer conversation. The read-mark is best effort;
    /// its failure does not block message display.
    pub async fn open_conversation(&self, peer: &str) -> Result<()> {
        let epoch = match self.messages.lock() {
            Ok(mut log) => log.open(peer),
            Err(_) => return Ok(()),
        };
        emit(&self.event_tx, ClientEvent::MessagesUpdated);

        let history = self.api.conversation_messages(peer).await?;

        let installed = match self.messages.lock() {
            Ok(mut log) => log.install(epoch, history),
            Err(_) => false,
        };
        if !installed {
            // Another conversation was opened while we were fetching.
            return Ok(());
        }
        emit(&self.event_tx, ClientEvent::MessagesUpdated);

        if let Err(e) = self.api.mark_conversation_read(peer).await {
            warn!(peer, error = %e, "Failed to mark conversation read");
        } else {
            if let Ok(mut index) = self.conversations.lock() {
                index.mark_read(peer);
            }
            // The badge prefers the server count, so re-fetch it now rather
            // than letting the stale value stand until the next poll.
            refresh_unread_badge(&self.api, &self.conversations).await;
            emit(&self.event_tx, ClientEvent::ConversationsUpdated);
        }

        Ok(())
    }

    /// Send `content` to the open peer, optionally as a reply.
    ///
    /// The message appears in the log immediately as a pending entry; on
    /// success it is confirmed in place and the authoritative record is
    /// returned. On failure the pending entry is rolled back and the error
    /// surfaces for a transient notice — the draft is not restored.
    pub async fn send_message(&self, content: &str, reply_to: Option<&str>) -> Result<Message> {
        let pending = self
            .messages
            .lock()
            .ok()
            .and_then(|mut log| log.append_pending(content, reply_to))
            .ok_or(ClientError::NoOpenConversation)?;
        emit(&self.event_tx, ClientEvent::MessagesUpdated);

        // A reply target that was not found in the log is dropped from the
        // pending entry; keep the wire request consistent with it.
        let reply_to = pending.reply.as_ref().map(|r| r.to.as_str());

        match self
            .api
            .send_message(&pending.to_user, &pending.content, reply_to)
            .await
        {
            Ok(record) => {
                let confirmed = Message::from(record.clone());
                if let Ok(mut log) = self.messages.lock() {
                    log.confirm(&pending.id, record);
                }
                emit(&self.event_tx, ClientEvent::MessagesUpdated);

                refresh_conversations(&self.api, &self.conversations, &self.event_tx).await;
                Ok(confirmed)
            }
            Err(e) => {
                if let Ok(mut log) = self.messages.lock() {
                    log.rollback(&pending.id);
                }
                emit(&self.event_tx, ClientEvent::MessagesUpdated);
                warn!(error = %e, "Send failed; optimistic entry rolled back");
                Err(e.into())
            }
        }
    }

    /// Retract one of the session user's own messages and drop it from the
    /// log.
    pub async fn delete_message(&self, id: &str) -> Result<()> {
        self.api.delete_message(id).await?;
        if let Ok(mut log) = self.messages.lock() {
            log.remove(id);
        }
        emit(&self.event_tx, ClientEvent::MessagesUpdated);
        Ok(())
    }

    /// Mark the conversation with `peer` read: flip local state, then
    /// re-fetch the server unread count so the badge updates immediately
    /// instead of on the next poll.
    pub async fn mark_conversation_read(&self, peer: &str) -> Result<()> {
        self.api.mark_conversation_read(peer).await?;
        if let Ok(mut index) = self.conversations.lock() {
            index.mark_read(peer);
        }
        refresh_unread_badge(&self.api, &self.conversations).await;
        emit(&self.event_tx, ClientEvent::ConversationsUpdated);
        Ok(())
    }

    /// Mark one notification read, flipping local state ahead of the next
    /// refresh.
    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.api.mark_notification_read(id).await?;
        if let Ok(mut feed) = self.notifications.lock() {
            feed.mark_read(id);
        }
        emit(&self.event_tx, ClientEvent::NotificationsUpdated);
        Ok(())
    }

    /// Mark every notification read.
    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.api.mark_all_notifications_read().await?;
        if let Ok(mut feed) = self.notifications.lock() {
            feed.mark_all_read();
        }
        emit(&self.event_tx, ClientEvent::NotificationsUpdated);
        Ok(())
    }

    /// Refresh the conversation index immediately, outside the poll cadence.
    pub async fn refresh_conversations(&self) {
        refresh_conversations(&self.api, &self.conversations, &self.event_tx).await;
    }

    /// Refresh the notification feed immediately, outside the poll cadence.
    pub async fn refresh_notifications(&self) {
        refresh_notifications(&self.api, &self.notifications, &self.event_tx).await;
    }

    /// Tear the client down: close the push channel and stop every timer.
    /// Idempotent.
    pub async fn shutdown(&mut self) {
        let _ = self.push_cmd_tx.send(PushCommand::Shutdown).await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(user = %self.session.username, "Chat client shut down");
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Forward push events into the stores and out to subscribers.
async fn push_bridge(
    mut push_rx: mpsc::Receiver<PushEvent>,
    api: ApiClient,
    session_user: String,
    messages: Arc<Mutex<MessageLog>>,
    conversations: Arc<Mutex<ConversationIndex>>,
    event_tx: broadcast::Sender<ClientEvent>,
) {
    info!("Push bridge started");

    while let Some(event) = push_rx.recv().await {
        match event {
            PushEvent::Connected => {
                emit(&event_tx, ClientEvent::ConnectionChanged { connected: true });
            }
            PushEvent::Disconnected => {
                emit(&event_tx, ClientEvent::ConnectionChanged { connected: false });
            }
            PushEvent::Message(record) => {
                let from_user = record.from_user.clone();
                let content = record.content.clone();

                let (applied, for_open_conversation) = match messages.lock() {
                    Ok(mut log) => {
                        let for_open = log.peer() == Some(from_user.as_str());
                        (log.apply_push(record), for_open)
                    }
                    Err(_) => continue,
                };
                if applied {
                    emit(&event_tx, ClientEvent::MessagesUpdated);
                }

                // Own messages echoed from another tab need no toast.
                if from_user != session_user {
                    emit(
                        &event_tx,
                        ClientEvent::MessageReceived {
                            from_user,
                            content,
                            for_open_conversation,
                        },
                    );
                }

                // Keep the index in step with push delivery, without waiting
                // for the next poll.
                refresh_conversations(&api, &conversations, &event_tx).await;
            }
        }
    }

    debug!("Push bridge ended");
}

/// Poll conversations, the message unread count and the online roster.
async fn conversation_poll_loop(
    api: ApiClient,
    conversations: Arc<Mutex<ConversationIndex>>,
    online_users: Arc<Mutex<Vec<String>>>,
    event_tx: broadcast::Sender<ClientEvent>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        refresh_conversations(&api, &conversations, &event_tx).await;

        match api.online_users().await {
            Ok(users) => {
                if let Ok(mut roster) = online_users.lock() {
                    *roster = users;
                }
                emit(&event_tx, ClientEvent::OnlineUsersUpdated);
            }
            Err(e) => debug!(error = %e, "Online roster fetch failed"),
        }
    }
}

/// Poll notifications and their unread count.
async fn notification_poll_loop(
    api: ApiClient,
    notifications: Arc<Mutex<NotificationFeed>>,
    event_tx: broadcast::Sender<ClientEvent>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        refresh_notifications(&api, &notifications, &event_tx).await;
    }
}

/// Replace the conversation index with a fresh fetch, degrading to an empty
/// list on failure; the next cycle is the retry.
async fn refresh_conversations(
    api: &ApiClient,
    conversations: &Arc<Mutex<ConversationIndex>>,
    event_tx: &broadcast::Sender<ClientEvent>,
) {
    let list = match api.conversations().await {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "Conversation refresh failed");
            Vec::new()
        }
    };

    if let Ok(mut index) = conversations.lock() {
        index.install(list);
    }

    refresh_unread_badge(api, conversations).await;

    emit(event_tx, ClientEvent::ConversationsUpdated);
}

/// Re-fetch the server's direct unread message count. Failure keeps the last
/// observed count; the badge stays where it was.
async fn refresh_unread_badge(api: &ApiClient, conversations: &Arc<Mutex<ConversationIndex>>) {
    match api.message_unread_count().await {
        Ok(count) => {
            if let Ok(mut index) = conversations.lock() {
                index.set_server_unread(count);
            }
        }
        Err(e) => debug!(error = %e, "Message unread count fetch failed"),
    }
}

/// Replace the notification feed with a fresh fetch, degrading to an empty
/// list on failure.
async fn refresh_notifications(
    api: &ApiClient,
    notifications: &Arc<Mutex<NotificationFeed>>,
    event_tx: &broadcast::Sender<ClientEvent>,
) {
    let list = match api.notifications().await {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "Notification refresh failed");
            Vec::new()
        }
    };

    if let Ok(mut feed) = notifications.lock() {
        feed.install(list);
    }

    match api.notification_unread_count().await {
        Ok(count) => {
            if let Ok(mut feed) = notifications.lock() {
                feed.set_server_unread(count);
            }
        }
        Err(e) => debug!(error = %e, "Notification unread count fetch failed"),
    }

    emit(event_tx, ClientEvent::NotificationsUpdated);
}
