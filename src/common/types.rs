//! Shared types used across the application.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a chat on the master platform (Telegram chat id).
pub type MasterChatId = i64;

/// Identifier of a master user (Telegram user id).
pub type MasterUserId = u64;

/// Whether a master chat is a private chat with one user. Telegram gives
/// private chats the user's (positive) id and groups negative ids.
pub fn is_private_chat(chat: MasterChatId) -> bool {
    chat > 0
}

/// Address of a single message on the master platform.
///
/// Telegram message ids are only unique within a chat, so the chat id is
/// part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: MasterChatId,
    pub message: i32,
}

impl MessageRef {
    pub fn new(chat: MasterChatId, message: i32) -> Self {
        Self { chat, message }
    }
}

/// A slave chat id qualified with the id of the slave channel that owns it.
///
/// Rendered as `<channel>.<chat>`. The channel id never contains a dot; the
/// native chat id may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedChatId {
    channel: String,
    chat: String,
}

impl QualifiedChatId {
    pub fn new(channel: impl Into<String>, chat: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            chat: chat.into(),
        }
    }

    /// Parse a `<channel>.<chat>` string. Both parts must be non-empty.
    pub fn parse(value: &str) -> Option<Self> {
        let (channel, chat) = value.split_once('.')?;
        if channel.is_empty() || chat.is_empty() {
            return None;
        }
        Some(Self::new(channel, chat))
    }

    /// The slave channel id.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The channel's native chat id.
    pub fn chat(&self) -> &str {
        &self.chat
    }
}

impl fmt::Display for QualifiedChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.channel, self.chat)
    }
}

impl TryFrom<String> for QualifiedChatId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid qualified chat id '{}'", value))
    }
}

impl From<QualifiedChatId> for String {
    fn from(id: QualifiedChatId) -> Self {
        id.to_string()
    }
}

/// Kind of conversation a slave chat or message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSource {
    User,
    Group,
    System,
    Unknown,
}

impl ChatSource {
    /// Parse a chat type name from configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "user" | "private" => Some(Self::User),
            "group" => Some(Self::Group),
            "system" => Some(Self::System),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A chat as listed by a slave backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaveChat {
    /// Native chat id within the backend.
    pub uid: String,
    pub name: String,
    pub alias: String,
    pub source: ChatSource,
}

/// Sender of a message inside a slave group chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub name: String,
    pub alias: String,
}
