//! # trouve-shared
//!
//! Domain model and wire protocol for the Trouvé chat client.
//!
//! Everything here is plain data: message/conversation/notification shapes as
//! the campus backend serves them, the push-channel frame envelope, and the
//! timing constants the other crates agree on. No I/O lives in this crate.

pub mod constants;
pub mod protocol;
pub mod types;

pub use protocol::{ClientFrame, MessageRecord, PushFrame};
pub use types::{
    Conversation, LastMessage, Message, MessageStatus, Notification, NotificationKind, ReplyRef,
    Session, UserProfile,
};
