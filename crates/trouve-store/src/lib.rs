//! # trouve-store
//!
//! In-memory client state for the Trouvé chat core: the reconciling message
//! log for the open conversation, the conversation index, and the
//! notification feed.
//!
//! Every store here is a plain single-owner state machine with no I/O —
//! fetching, sending and read-marking live in `trouve-client`, which feeds
//! results in through these methods. UI consumers read snapshots and never
//! mutate. When shared across tasks, wrap a store in `Arc<Mutex<_>>`; its
//! methods never block or suspend.

pub mod conversations;
pub mod messages;
pub mod notifications;

pub use conversations::ConversationIndex;
pub use messages::MessageLog;
pub use notifications::NotificationFeed;
