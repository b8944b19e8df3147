//! Master transport abstraction.
//!
//! The linker and router only talk to the master platform through
//! [`MasterTransport`], so they can be driven by Telegram in production and
//! by a recording double in tests.

use async_trait::async_trait;

use crate::common::error::TransportResult;
use crate::common::types::{MasterChatId, MessageRef};

/// What pressing an inline button does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceAction {
    /// Send this payload back as a callback.
    Callback(String),
    /// Open this URL.
    Link(String),
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub action: ChoiceAction,
}

impl Choice {
    pub fn callback(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ChoiceAction::Callback(payload.into()),
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ChoiceAction::Link(url.into()),
        }
    }
}

/// Rows of inline buttons.
pub type ChoiceGrid = Vec<Vec<Choice>>;

#[async_trait]
pub trait MasterTransport: Send + Sync {
    /// Send a text message and return its address.
    async fn send_text(&self, chat: MasterChatId, text: &str) -> TransportResult<MessageRef>;

    /// Send a text message as a reply to `to`.
    async fn reply_text(&self, to: MessageRef, text: &str) -> TransportResult<MessageRef>;

    /// Send a text message with inline buttons.
    async fn send_choices(
        &self,
        chat: MasterChatId,
        text: &str,
        choices: &[Vec<Choice>],
    ) -> TransportResult<MessageRef>;

    /// Replace the text of a sent message. Without `choices` the buttons
    /// are removed.
    async fn edit_text(
        &self,
        target: MessageRef,
        text: &str,
        choices: Option<&[Vec<Choice>]>,
    ) -> TransportResult<()>;

    /// URL that adds the bot to a group and sends `/start <start_param>`
    /// there.
    fn group_link_url(&self, start_param: &str) -> String;
}
