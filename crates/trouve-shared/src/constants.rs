/// Interval between keep-alive ping frames on the push channel.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Delay before re-dialing the push channel after it closes or fails to open.
pub const RECONNECT_DELAY_SECS: u64 = 3;

/// Cadence of the fallback polling timers (conversations, notifications,
/// unread counts, online users).
pub const POLL_INTERVAL_SECS: u64 = 30;

/// Default REST endpoint of the campus backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default push channel endpoint. The session username is appended as a path
/// segment and the bearer token as a `token` query parameter.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Default timeout applied to every REST request (seconds, 0 disables).
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Prefix of client-assigned temporary message ids. Never sent to the server.
pub const TEMP_ID_PREFIX: &str = "temp-";
