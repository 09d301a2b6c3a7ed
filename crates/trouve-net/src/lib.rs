// Transport layer for the Trouvé chat client: the authenticated REST client
// and the push (WebSocket) channel with its reconnecting lifecycle.

pub mod error;
pub mod push;
pub mod rest;

pub use error::{NetError, Result};
pub use push::{spawn_push, ChannelState, PushCommand, PushConfig, PushEvent};
pub use rest::ApiClient;
