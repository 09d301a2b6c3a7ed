//! Push channel lifecycle with a tokio mpsc command/event pattern.
//!
//! The WebSocket connection lives in a dedicated tokio task that owns the
//! socket exclusively; at most one channel exists per session. External code
//! talks to it through typed command and event channels. The task dials,
//! heartbeats, decodes push frames, and re-dials after any close or failure
//! at a fixed delay, for as long as it is alive. Dropping the command sender
//! or sending [`PushCommand::Shutdown`] tears the channel down; no events are
//! delivered afterwards.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use trouve_shared::constants::{
    DEFAULT_WS_URL, HEARTBEAT_INTERVAL_SECS, RECONNECT_DELAY_SECS,
};
use trouve_shared::protocol::{ClientFrame, MessageRecord, PushFrame};
use trouve_shared::types::Session;

// ---------------------------------------------------------------------------
// Command / event types
// ---------------------------------------------------------------------------

/// Lifecycle state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No socket; waiting for the next dial (or never dialed yet).
    Idle,
    /// Dial in progress.
    Connecting,
    /// Socket open, heartbeat running.
    Open,
}

/// Commands sent *into* the push task.
#[derive(Debug)]
pub enum PushCommand {
    /// Request a snapshot of the current channel state.
    GetState(tokio::sync::oneshot::Sender<ChannelState>),
    /// Close the socket and end the task.
    Shutdown,
}

/// Events sent *from* the push task to the application.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// The channel opened (initially or after a reconnect).
    Connected,
    /// The channel closed; a re-dial is scheduled.
    Disconnected,
    /// The server pushed a new message.
    Message(MessageRecord),
}

/// Configuration for spawning the push channel.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Base WebSocket endpoint; username and token are appended.
    pub ws_url: String,
    /// Interval between keep-alive ping frames.
    pub heartbeat_interval: Duration,
    /// Fixed delay before re-dialing after a close or dial failure.
    ///
    /// There is deliberately no backoff or retry cap: the channel re-dials
    /// for as long as the session lives.
    pub reconnect_delay: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
        }
    }
}

/// Spawn the push channel task for `session`.
///
/// Returns channels for sending commands and receiving events. The task ends
/// when it receives [`PushCommand::Shutdown`], when all command senders are
/// dropped, or when the event receiver is dropped.
pub fn spawn_push(
    session: &Session,
    config: PushConfig,
) -> (mpsc::Sender<PushCommand>, mpsc::Receiver<PushEvent>) {
    let url = format!(
        "{}/{}?token={}",
        config.ws_url.trim_end_matches('/'),
        session.username,
        session.token
    );
    let username = session.username.clone();

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<PushCommand>(256);
    let (event_tx, event_rx) = mpsc::channel::<PushEvent>(256);

    tokio::spawn(async move {
        info!(user = %username, "Push channel task started");

        loop {
            // --- Connecting ---
            let connect = tokio_tungstenite::connect_async(url.as_str());
            tokio::pin!(connect);

            let mut ws = loop {
                tokio::select! {
                    res = &mut connect => match res {
                        Ok((ws, _)) => break Some(ws),
                        Err(e) => {
                            warn!(error = %e, "Push channel dial failed");
                            break None;
                        }
                    },
                    cmd = cmd_rx.recv() => match cmd {
                        Some(PushCommand::GetState(reply)) => {
                            let _ = reply.send(ChannelState::Connecting);
                        }
                        Some(PushCommand::Shutdown) | None => {
                            info!("Push channel shut down while connecting");
                            return;
                        }
                    },
                }
            };

            // --- Open ---
            if let Some(ref mut ws) = ws {
                info!(user = %username, "Push channel open");
                if event_tx.send(PushEvent::Connected).await.is_err() {
                    return;
                }

                let start = tokio::time::Instant::now() + config.heartbeat_interval;
                let mut heartbeat =
                    tokio::time::interval_at(start, config.heartbeat_interval);

                let mut open = true;
                while open {
                    tokio::select! {
                        cmd = cmd_rx.recv() => match cmd {
                            Some(PushCommand::GetState(reply)) => {
                                let _ = reply.send(ChannelState::Open);
                            }
                            Some(PushCommand::Shutdown) | None => {
                                let _ = ws.close(None).await;
                                info!("Push channel shut down");
                                return;
                            }
                        },

                        _ = heartbeat.tick() => {
                            let frame = match ClientFrame::Ping.to_json() {
                                Ok(f) => f,
                                Err(_) => continue,
                            };
                            if let Err(e) = ws.send(WsMessage::text(frame)).await {
                                // Socket no longer writable; the tick itself
                                // is a no-op and the close path takes over.
                                debug!(error = %e, "Heartbeat send failed");
                                open = false;
                            }
                        }

                        frame = ws.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                match PushFrame::from_json(text.as_str()) {
                                    Ok(PushFrame::NewMessage { message }) => {
                                        debug!(id = %message.id, from = %message.from_user, "Push message received");
                                        if event_tx.send(PushEvent::Message(message)).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(e) => {
                                        warn!(error = %e, "Dropping unrecognized push frame");
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("Push channel closed by server");
                                open = false;
                            }
                            Some(Ok(_)) => {
                                // Binary / ping / pong frames carry nothing for us.
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "Push channel transport error");
                                open = false;
                            }
                        },
                    }
                }

                if event_tx.send(PushEvent::Disconnected).await.is_err() {
                    return;
                }
            }

            // --- Idle, reconnect pending ---
            if !wait_for_redial(&mut cmd_rx, config.reconnect_delay).await {
                return;
            }
        }
    });

    (cmd_tx, event_rx)
}

/// Sleep out the reconnect delay while still answering commands.
///
/// Returns false if a shutdown arrived, ending the task.
async fn wait_for_redial(cmd_rx: &mut mpsc::Receiver<PushCommand>, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = cmd_rx.recv() => match cmd {
                Some(PushCommand::GetState(reply)) => {
                    let _ = reply.send(ChannelState::Idle);
                }
                Some(PushCommand::Shutdown) | None => {
                    info!("Push channel shut down");
                    return false;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::WebSocketStream;

    fn test_session() -> Session {
        Session {
            username: "alice".into(),
            display_name: "Alice".into(),
            token: "tok".into(),
            avatar_url: None,
        }
    }

    fn test_config(port: u16) -> PushConfig {
        PushConfig {
            ws_url: format!("ws://127.0.0.1:{port}/ws"),
            heartbeat_interval: Duration::from_millis(50),
            reconnect_delay: Duration::from_millis(50),
        }
    }

    async fn bind() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    }

    fn record(id: &str) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            from_user: "bob".into(),
            to_user: "alice".into(),
            content: "hello".into(),
            timestamp: Utc::now(),
            is_read: false,
            reply_to: None,
            reply_content: None,
            reply_author: None,
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_connects_and_heartbeats() {
        let (listener, port) = bind().await;
        let (cmd_tx, mut event_rx) = spawn_push(&test_session(), test_config(port));

        let mut server = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        // First keep-alive arrives one interval after open.
        let frame = server.next().await.unwrap().unwrap();
        let text = frame.to_text().unwrap();
        assert_eq!(text, r#"{"type":"ping"}"#);

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        cmd_tx.send(PushCommand::GetState(reply_tx)).await.unwrap();
        assert_eq!(reply_rx.await.unwrap(), ChannelState::Open);

        cmd_tx.send(PushCommand::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_delivers_push_messages_and_drops_garbage() {
        let (listener, port) = bind().await;
        let (cmd_tx, mut event_rx) = spawn_push(&test_session(), test_config(port));

        let mut server = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        // Garbage and unknown frame types must be dropped without killing
        // the channel.
        server.send(WsMessage::text("{not json")).await.unwrap();
        server
            .send(WsMessage::text(r#"{"type":"user_typing"}"#))
            .await
            .unwrap();

        let frame = PushFrame::NewMessage { message: record("m7") };
        server
            .send(WsMessage::text(frame.to_json().unwrap()))
            .await
            .unwrap();

        match event_rx.recv().await {
            Some(PushEvent::Message(rec)) => assert_eq!(rec.id, "m7"),
            other => panic!("expected pushed message, got {other:?}"),
        }

        cmd_tx.send(PushCommand::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnects_after_server_close() {
        let (listener, port) = bind().await;
        let (cmd_tx, mut event_rx) = spawn_push(&test_session(), test_config(port));

        let mut server = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        server.close(None).await.unwrap();
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Disconnected)));

        // The channel must dial again on its own after the fixed delay.
        let _server2 = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        cmd_tx.send(PushCommand::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_on_dead_socket_disconnects_cleanly() {
        let (listener, port) = bind().await;
        let (cmd_tx, mut event_rx) = spawn_push(&test_session(), test_config(port));

        let mut server = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        // Let at least one keep-alive go out, then kill the transport with
        // no close handshake. The next tick's write (or the dead read side,
        // whichever the task hits first) must come down as an ordinary
        // disconnect, never a panic.
        let _ = server.next().await;
        drop(server);

        assert!(matches!(event_rx.recv().await, Some(PushEvent::Disconnected)));

        // The task is still alive and re-dials on schedule.
        let _server2 = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        cmd_tx.send(PushCommand::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_event_delivery() {
        let (listener, port) = bind().await;
        let (cmd_tx, mut event_rx) = spawn_push(&test_session(), test_config(port));

        let mut server = accept(&listener).await;
        assert!(matches!(event_rx.recv().await, Some(PushEvent::Connected)));

        cmd_tx.send(PushCommand::Shutdown).await.unwrap();

        // Frames sent after teardown must never surface as events; the event
        // channel just closes.
        let frame = PushFrame::NewMessage { message: record("m9") };
        let _ = server.send(WsMessage::text(frame.to_json().unwrap())).await;

        assert!(event_rx.recv().await.is_none());
    }
}
