//! Message formatting for display.
//!
//! Handles display-name rules, glyphs and placeholder substitution in
//! format strings. Supports placeholders: %emoji, %chat, %user, %message

use crate::common::messages::SlaveMessage;
use crate::common::types::{ChatMember, ChatSource, SlaveChat};
use crate::config::types::FormatConfig;

/// Default format for group messages into a linked master chat.
pub const DEFAULT_LINKED_GROUP_FORMAT: &str = "%user:\n%message";

/// Default format for group messages into the operator's chat.
pub const DEFAULT_UNLINKED_GROUP_FORMAT: &str = "%emoji [%chat] %user:\n%message";

/// Default format for direct and system messages into the operator's chat.
pub const DEFAULT_UNLINKED_DIRECT_FORMAT: &str = "%emoji %chat:\n%message";

pub const LINK_GLYPH: &str = "🔗";
pub const USER_GLYPH: &str = "👤";
pub const GROUP_GLYPH: &str = "👥";
pub const SYSTEM_GLYPH: &str = "💻";
pub const UNKNOWN_GLYPH: &str = "❓";

/// Glyph for a chat source type.
pub fn source_glyph(source: ChatSource) -> &'static str {
    match source {
        ChatSource::User => USER_GLYPH,
        ChatSource::Group => GROUP_GLYPH,
        ChatSource::System => SYSTEM_GLYPH,
        ChatSource::Unknown => UNKNOWN_GLYPH,
    }
}

/// Display name of a chat: the alias alone when it equals the name,
/// otherwise `alias (name)`.
pub fn display_name(alias: &str, name: &str) -> String {
    if alias == name {
        alias.to_string()
    } else {
        format!("{} ({})", alias, name)
    }
}

/// Label for the sender of a group message: the alias alone when it equals
/// the name, otherwise `name (alias)`.
pub fn member_label(member: &ChatMember) -> String {
    if member.alias == member.name {
        member.alias.clone()
    } else {
        format!("{} ({})", member.name, member.alias)
    }
}

/// Label of a chat option in the link dialog.
pub fn chat_option_label(slave_emoji: &str, chat: &SlaveChat, linked: bool) -> String {
    format!(
        "{}{}: {}{}",
        slave_emoji,
        source_glyph(chat.source),
        display_name(&chat.alias, &chat.name),
        if linked { LINK_GLYPH } else { "" }
    )
}

/// Message formatter that substitutes placeholders in format strings.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    /// Format string for this formatter.
    format: String,
}

impl MessageFormatter {
    /// Create a new formatter with the given format string.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Format a message with the given context.
    ///
    /// Substitution is a single pass over the format string, so placeholder
    /// text inside a substituted value is kept verbatim.
    pub fn format(&self, ctx: &FormatContext) -> String {
        let mut out = String::with_capacity(self.format.len() + ctx.message.len());
        let mut rest = self.format.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            let (value, len) = if tail.starts_with("%emoji") {
                (ctx.emoji.as_str(), "%emoji".len())
            } else if tail.starts_with("%chat") {
                (ctx.chat.as_str(), "%chat".len())
            } else if tail.starts_with("%user") {
                (ctx.user.as_str(), "%user".len())
            } else if tail.starts_with("%message") {
                (ctx.message.as_str(), "%message".len())
            } else {
                ("%", 1)
            };
            out.push_str(value);
            rest = &tail[len..];
        }
        out.push_str(rest);
        out
    }
}

/// Context for message formatting.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    /// Slave and source glyphs.
    pub emoji: String,
    /// Display name of the slave chat.
    pub chat: String,
    /// Sender label (group messages only).
    pub user: String,
    /// The message content.
    pub message: String,
}

impl FormatContext {
    /// Build the context for a slave message.
    pub fn from_slave_message(msg: &SlaveMessage) -> Self {
        Self {
            emoji: format!("{}{}", msg.channel_emoji, source_glyph(msg.chat.source)),
            chat: display_name(&msg.chat.alias, &msg.chat.name),
            user: match msg.member {
                Some(ref member) => member_label(member),
                None if msg.is_group() => UNKNOWN_GLYPH.to_string(),
                None => String::new(),
            },
            message: msg.text.clone(),
        }
    }
}

/// Formats slave messages for their master destination.
#[derive(Debug, Clone)]
pub struct RelayFormatter {
    linked_group: MessageFormatter,
    unlinked_group: MessageFormatter,
    unlinked_direct: MessageFormatter,
}

impl RelayFormatter {
    pub fn new(config: &FormatConfig) -> Self {
        Self {
            linked_group: MessageFormatter::new(&config.linked_group),
            unlinked_group: MessageFormatter::new(&config.unlinked_group),
            unlinked_direct: MessageFormatter::new(&config.unlinked_direct),
        }
    }

    /// Body for a message going to the master chat linked with its origin.
    /// Only group messages get a sender prefix; a sender the backend did not
    /// report is shown as the unknown glyph.
    pub fn linked(&self, msg: &SlaveMessage) -> String {
        if msg.is_group() {
            self.linked_group
                .format(&FormatContext::from_slave_message(msg))
        } else {
            msg.text.clone()
        }
    }

    /// Body for a message going to the operator's own chat.
    pub fn unlinked(&self, msg: &SlaveMessage) -> String {
        let ctx = FormatContext::from_slave_message(msg);
        if msg.is_group() {
            self.unlinked_group.format(&ctx)
        } else {
            self.unlinked_direct.format(&ctx)
        }
    }
}

impl Default for RelayFormatter {
    fn default() -> Self {
        Self::new(&FormatConfig::default())
    }
}
