//! Slave messaging backends.
//!
//! Each backend is a separate implementation of [`SlaveBackend`], registered
//! by id in the [`SlaveRegistry`]. Backends push received messages into the
//! bridge's inbound queue and accept outgoing text through `send`.

pub mod loopback;
pub mod registry;

use async_trait::async_trait;

use crate::common::error::SlaveResult;
use crate::common::types::SlaveChat;

pub use loopback::LoopbackSlave;
pub use registry::SlaveRegistry;

/// Capabilities the relay needs from a slave backend.
#[async_trait]
pub trait SlaveBackend: Send + Sync {
    /// Channel identifier (e.g. "wechat"). Must not contain a dot.
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn display_name(&self) -> &str;

    /// Identity glyph shown next to messages and chats of this channel.
    fn emoji(&self) -> &str;

    /// All chats currently reachable through this channel.
    async fn list_chats(&self) -> SlaveResult<Vec<SlaveChat>>;

    /// Send text to one of this channel's chats.
    ///
    /// Returns [`SlaveError::ChatNotFound`](crate::common::error::SlaveError::ChatNotFound)
    /// when the chat does not exist.
    async fn send(&self, chat_uid: &str, text: &str) -> SlaveResult<()>;
}
