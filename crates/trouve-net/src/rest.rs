//! Authenticated REST client for the campus backend.
//!
//! One typed method per endpoint the chat core consumes. Every request
//! carries the session's bearer token; non-success statuses become
//! [`NetError::Status`] so callers can degrade without inspecting bodies.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use trouve_shared::protocol::MessageRecord;
use trouve_shared::types::{Conversation, Notification};

use crate::error::{NetError, Result};

/// HTTP client bound to one backend instance and one session credential.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    to_user: &'a str,
    content: &'a str,
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    unread_count: u32,
}

impl ApiClient {
    /// Build a client for `base_url` authenticated with `token`.
    ///
    /// `timeout` bounds every request; `Duration::ZERO` disables it.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(path: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(path, resp).await?.json::<T>().await?)
    }

    async fn put_empty(&self, path: &str) -> Result<()> {
        debug!(path, "PUT");
        let resp = self
            .http
            .put(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(path, resp).await?;
        Ok(())
    }

    /// All conversation summaries for the session user.
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        self.get_json("/conversations").await
    }

    /// Full ordered message history with `username`, oldest first.
    pub async fn conversation_messages(&self, username: &str) -> Result<Vec<MessageRecord>> {
        self.get_json(&format!("/conversations/{username}/messages"))
            .await
    }

    /// Mark every message from `username` as read. Idempotent.
    pub async fn mark_conversation_read(&self, username: &str) -> Result<()> {
        self.put_empty(&format!("/conversations/{username}/read"))
            .await
    }

    /// Send a message; the backend assigns the id and timestamp and returns
    /// the authoritative record.
    pub async fn send_message(
        &self,
        to_user: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<MessageRecord> {
        let path = "/messages/send";
        debug!(to_user, "POST {path}");
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&SendMessageBody {
                to_user,
                content,
                reply_to,
            })
            .send()
            .await?;
        Ok(Self::check(path, resp).await?.json().await?)
    }

    /// Retract one of the session user's own messages.
    pub async fn delete_message(&self, id: &str) -> Result<()> {
        let path = format!("/messages/{id}");
        debug!(path = %path, "DELETE");
        let resp = self
            .http
            .delete(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(&path, resp).await?;
        Ok(())
    }

    /// Server-side count of unread direct messages.
    pub async fn message_unread_count(&self) -> Result<u32> {
        let count: UnreadCount = self.get_json("/messages/unread-count").await?;
        Ok(count.unread_count)
    }

    /// Usernames currently connected to the push endpoint.
    pub async fn online_users(&self) -> Result<Vec<String>> {
        self.get_json("/chat/online-users").await
    }

    /// All notifications for the session user, newest first.
    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        self.get_json("/notifications").await
    }

    /// Mark a single notification as read. Idempotent.
    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.put_empty(&format!("/notifications/{id}/read")).await
    }

    /// Mark every notification as read. Idempotent.
    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.put_empty("/notifications/read-all").await
    }

    /// Server-side count of unread notifications.
    pub async fn notification_unread_count(&self) -> Result<u32> {
        let count: UnreadCount = self.get_json("/notifications/unread-count").await?;
        Ok(count.unread_count)
    }
}
