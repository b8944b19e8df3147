//! Configuration type definitions.

use serde::Deserialize;

use crate::bridge::formatter::{
    DEFAULT_LINKED_GROUP_FORMAT, DEFAULT_UNLINKED_DIRECT_FORMAT, DEFAULT_UNLINKED_GROUP_FORMAT,
};

/// Default bound on the reply-resolution message log.
pub const DEFAULT_MESSAGE_LOG_LIMIT: usize = 10_000;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub master: MasterConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub formats: FormatConfig,
    #[serde(default)]
    pub slaves: SlavesConfig,
}

/// Telegram master bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterConfig {
    /// Bot API token.
    pub token: String,
    /// Telegram user id of the operator; also the id of their private chat.
    pub operator_id: i64,
    /// Additional user ids allowed to drive the bot.
    #[serde(default)]
    pub admins: Vec<u64>,
}

/// Association store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot file. Without it the store lives in memory only.
    #[serde(default)]
    pub path: Option<String>,
    /// Maximum number of message log entries kept for reply resolution.
    #[serde(default = "default_message_log_limit")]
    pub message_log_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            message_log_limit: DEFAULT_MESSAGE_LOG_LIMIT,
        }
    }
}

fn default_message_log_limit() -> usize {
    DEFAULT_MESSAGE_LOG_LIMIT
}

/// Link dialog session settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Seconds before an unfinished link dialog expires (None = never).
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Format strings for messages relayed to the master.
///
/// Placeholders: `%emoji`, `%chat`, `%user`, `%message`.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatConfig {
    /// Group message into a linked chat.
    #[serde(default = "default_linked_group")]
    pub linked_group: String,
    /// Group message into the operator's chat.
    #[serde(default = "default_unlinked_group")]
    pub unlinked_group: String,
    /// Direct or system message into the operator's chat.
    #[serde(default = "default_unlinked_direct")]
    pub unlinked_direct: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            linked_group: default_linked_group(),
            unlinked_group: default_unlinked_group(),
            unlinked_direct: default_unlinked_direct(),
        }
    }
}

fn default_linked_group() -> String {
    DEFAULT_LINKED_GROUP_FORMAT.to_string()
}

fn default_unlinked_group() -> String {
    DEFAULT_UNLINKED_GROUP_FORMAT.to_string()
}

fn default_unlinked_direct() -> String {
    DEFAULT_UNLINKED_DIRECT_FORMAT.to_string()
}

/// Built-in slave backends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlavesConfig {
    #[serde(default)]
    pub loopback: Option<LoopbackConfig>,
}

/// Loopback backend used for smoke testing the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct LoopbackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub chats: Vec<LoopbackChatConfig>,
}

/// A chat exposed by the loopback backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LoopbackChatConfig {
    pub uid: String,
    pub name: String,
    /// Defaults to `name` when absent.
    #[serde(default)]
    pub alias: Option<String>,
    /// One of: user, group, system, unknown.
    #[serde(rename = "type", default = "default_chat_type")]
    pub chat_type: String,
}

fn default_chat_type() -> String {
    "user".to_string()
}

impl Config {
    /// User ids allowed to drive the bot (operator first).
    pub fn allowed_users(&self) -> Vec<u64> {
        let mut users = Vec::with_capacity(self.master.admins.len() + 1);
        if let Ok(operator) = u64::try_from(self.master.operator_id) {
            users.push(operator);
        }
        for admin in &self.master.admins {
            if !users.contains(admin) {
                users.push(*admin);
            }
        }
        users
    }

    /// Whether the loopback backend should be registered.
    pub fn loopback_enabled(&self) -> bool {
        self.slaves.loopback.as_ref().is_some_and(|l| l.enabled)
    }
}
