//! Canonical message types for relay communication.

use crate::common::types::{
    ChatMember, ChatSource, MasterChatId, MessageRef, QualifiedChatId, SlaveChat,
};

/// Message pushed by a slave backend into the inbound queue.
#[derive(Debug, Clone)]
pub struct SlaveMessage {
    /// Id of the slave channel that received the message.
    pub channel_id: String,
    /// Identity glyph of that slave channel.
    pub channel_emoji: String,
    /// The slave chat the message was posted in.
    pub chat: SlaveChat,
    /// Sender inside a group chat (None for direct and system chats).
    pub member: Option<ChatMember>,
    /// Message text.
    pub text: String,
}

impl SlaveMessage {
    /// Qualified id of the originating chat.
    pub fn origin(&self) -> QualifiedChatId {
        QualifiedChatId::new(&self.channel_id, &self.chat.uid)
    }

    /// Whether the message comes from a group chat.
    pub fn is_group(&self) -> bool {
        self.chat.source == ChatSource::Group
    }
}

/// Plain text message received by the master transport.
#[derive(Debug, Clone)]
pub struct MasterMessage {
    /// Address of this message.
    pub id: MessageRef,
    /// Message the user replied to, if any.
    pub reply_to: Option<MessageRef>,
    /// Message text.
    pub text: String,
}

impl MasterMessage {
    /// Chat the message was posted in.
    pub fn chat(&self) -> MasterChatId {
        self.id.chat
    }
}
