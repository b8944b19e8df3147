//! Persistence of chat associations and the reply-resolution message log.

pub mod memory;

use async_trait::async_trait;

use crate::common::error::StoreResult;
use crate::common::types::{MasterChatId, MessageRef, QualifiedChatId};

pub use memory::MemoryStore;

/// Persistent storage for master ⇄ slave chat bindings.
///
/// Bindings are functional in both directions: a master chat is bound to at
/// most one slave chat and a slave chat to at most one master chat. Each call
/// is atomic on its own; callers never assume multi-call transactions.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Master chat bound to a slave chat.
    async fn master_for(&self, slave: &QualifiedChatId) -> StoreResult<Option<MasterChatId>>;

    /// Slave chat bound to a master chat.
    async fn slave_for(&self, master: MasterChatId) -> StoreResult<Option<QualifiedChatId>>;

    /// Bind a master chat to a slave chat, replacing any previous binding
    /// of either side.
    async fn associate(&self, master: MasterChatId, slave: &QualifiedChatId) -> StoreResult<()>;

    /// Remove the binding of a slave chat. Returns whether one existed.
    async fn dissociate(&self, slave: &QualifiedChatId) -> StoreResult<bool>;

    /// Record that `master_message` was forwarded from `slave`.
    async fn log_message(&self, master_message: MessageRef, slave: &QualifiedChatId)
        -> StoreResult<()>;

    /// Slave chat a previously forwarded master message came from.
    async fn logged_origin(&self, master_message: MessageRef)
        -> StoreResult<Option<QualifiedChatId>>;
}
