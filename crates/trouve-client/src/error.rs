use thiserror::Error;

/// Errors surfaced by [`crate::ChatClient`] methods.
///
/// Everything here is recoverable: sends roll back, fetches degrade, and the
/// push channel re-dials on its own. Nothing in this crate is fatal to the
/// process.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure from the REST client.
    #[error(transparent)]
    Net(#[from] trouve_net::NetError),

    /// A message operation was attempted with no conversation open.
    #[error("No conversation is open")]
    NoOpenConversation,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
