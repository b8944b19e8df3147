//! Chat linking dialog.
//!
//! `/link` in the operator's chat lists every slave chat. Picking one shows
//! the actions available for it: Link/Relink are deep links that add the bot
//! to a group, where `/start <param>` completes the association; Unlink is a
//! callback that removes it. `/link` inside a linked group, or as a reply to a
//! forwarded message, skips the list and goes straight to the actions.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::common::error::{RelayError, RelayResult};
use crate::common::messages::MasterMessage;
use crate::common::types::{is_private_chat, MasterChatId, MessageRef, QualifiedChatId};
use crate::master::transport::{Choice, ChoiceGrid, MasterTransport};
use crate::slave::SlaveRegistry;
use crate::store::AssociationStore;

use super::formatter::{
    chat_option_label, GROUP_GLYPH, LINK_GLYPH, SYSTEM_GLYPH, UNKNOWN_GLYPH, USER_GLYPH,
};
use super::payload::{
    decode_start_param, encode_action, encode_choice, encode_start_param, Payload, CANCEL,
    UNLINK_VERB,
};
use super::session::{LinkStage, SessionTracker};

pub const CANCELLED_TEXT: &str = "Cancelled.";
pub const ASSOCIATED_TEXT: &str = "Chat has been associated.";

/// Result of one step of the linking dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Chat list shown, waiting for a choice.
    Listed(MessageRef),
    /// Actions for one chat shown, waiting for the final tap.
    AwaitingAction(MessageRef),
    Cancelled,
    Unlinked(QualifiedChatId),
    Linked {
        group: MasterChatId,
        chat: QualifiedChatId,
    },
    /// Group-side `/start` that does not complete any dialog.
    Ignored,
}

pub struct ChatLinker {
    sessions: SessionTracker,
    store: Arc<dyn AssociationStore>,
    slaves: Arc<SlaveRegistry>,
    transport: Arc<dyn MasterTransport>,
    operator: MasterChatId,
}

impl ChatLinker {
    pub fn new(
        sessions: SessionTracker,
        store: Arc<dyn AssociationStore>,
        slaves: Arc<SlaveRegistry>,
        transport: Arc<dyn MasterTransport>,
        operator: MasterChatId,
    ) -> Self {
        Self {
            sessions,
            store,
            slaves,
            transport,
            operator,
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Handle `/link`.
    ///
    /// In a group, the chat linked with that group is used and the dialog
    /// goes to the operator. In a private chat (the operator's or an
    /// admin's) a reply uses the origin of the replied-to message, otherwise
    /// the full chat list is shown; either way the dialog stays in that chat.
    pub async fn handle_link_command(&self, msg: &MasterMessage) -> RelayResult<LinkOutcome> {
        let private = msg.chat() == self.operator || is_private_chat(msg.chat());
        let home = if private { msg.chat() } else { self.operator };
        let candidate = if !private {
            Some(self.store.slave_for(msg.chat()).await?)
        } else if let Some(reply_to) = msg.reply_to {
            Some(self.store.logged_origin(reply_to).await?)
        } else {
            None
        };

        match candidate {
            None => self.show_chat_list(home).await,
            Some(Some(candidate)) => self.show_actions_for(home, candidate).await,
            Some(None) => Err(RelayError::NoLinkedChat),
        }
    }

    /// Send the chat list and start a dialog on it.
    pub async fn show_chat_list(&self, chat: MasterChatId) -> RelayResult<LinkOutcome> {
        let lists = join_all(
            self.slaves
                .iter()
                .map(|backend| async move { (backend, backend.list_chats().await) }),
        )
        .await;

        let mut grid: ChoiceGrid = Vec::new();
        for (backend, result) in lists {
            let chats = match result {
                Ok(chats) => chats,
                Err(e) => {
                    warn!("Failed to list chats of '{}': {}", backend.id(), e);
                    continue;
                }
            };

            for slave_chat in chats {
                let candidate = QualifiedChatId::new(backend.id(), &slave_chat.uid);
                let linked = self.store.master_for(&candidate).await?.is_some();
                let label = chat_option_label(backend.emoji(), &slave_chat, linked);
                match encode_choice(&candidate, &label) {
                    Some(payload) => grid.push(vec![Choice::callback(label, payload)]),
                    None => warn!("Chat id '{}' is too long to offer for linking", candidate),
                }
            }
        }
        grid.push(vec![Choice::callback("Cancel", CANCEL)]);

        let dialog = self
            .transport
            .send_choices(chat, &self.chat_list_text(), &grid)
            .await?;
        self.sessions.begin(dialog).await;
        info!("Link dialog {:?} started with {} chats", dialog, grid.len() - 1);
        Ok(LinkOutcome::Listed(dialog))
    }

    /// Handle an inline button tap on `dialog`.
    ///
    /// User-facing failures are shown by editing the dialog and then
    /// returned.
    pub async fn handle_callback(&self, dialog: MessageRef, data: &str) -> RelayResult<LinkOutcome> {
        match self.advance(dialog, data).await {
            Err(e) if e.is_user_facing() => {
                self.transport.edit_text(dialog, &e.to_string(), None).await?;
                Err(e)
            }
            result => result,
        }
    }

    /// Complete a dialog from the group it should be linked with.
    ///
    /// Ignored unless the argument names a chat of a registered backend that
    /// a dialog is waiting on.
    pub async fn complete_group_link(
        &self,
        group: MasterChatId,
        arg: &str,
    ) -> RelayResult<LinkOutcome> {
        let Some(candidate) = decode_start_param(arg) else {
            warn!("Ignoring /start with unreadable argument '{}'", arg);
            return Ok(LinkOutcome::Ignored);
        };
        if !self.slaves.contains(candidate.channel()) {
            warn!("Ignoring /start for unknown channel '{}'", candidate.channel());
            return Ok(LinkOutcome::Ignored);
        }
        let Some(dialog) = self.sessions.take_candidate(&candidate).await else {
            warn!("Ignoring /start for '{}': no dialog is waiting on it", candidate);
            return Ok(LinkOutcome::Ignored);
        };

        self.store.associate(group, &candidate).await?;
        info!("Linked {} with master chat {}", candidate, group);

        self.transport.send_text(group, ASSOCIATED_TEXT).await?;
        self.transport.edit_text(dialog, ASSOCIATED_TEXT, None).await?;
        Ok(LinkOutcome::Linked {
            group,
            chat: candidate,
        })
    }

    async fn advance(&self, dialog: MessageRef, data: &str) -> RelayResult<LinkOutcome> {
        let Some(stage) = self.sessions.stage(dialog).await else {
            debug!("Callback on untracked dialog {:?}", dialog);
            return Err(RelayError::SessionExpired);
        };

        match (stage, Payload::decode(data)) {
            (_, Payload::Cancel) => {
                if self.sessions.finish(dialog).await.is_none() {
                    return Err(RelayError::SessionExpired);
                }
                self.transport.edit_text(dialog, CANCELLED_TEXT, None).await?;
                info!("Link dialog {:?} cancelled", dialog);
                Ok(LinkOutcome::Cancelled)
            }
            (LinkStage::AwaitingChatChoice, Payload::Choice { candidate, label }) => {
                if !self.sessions.choose(dialog, &candidate).await {
                    return Err(RelayError::SessionExpired);
                }
                let (text, grid) = self.actions_for(&candidate, &label, data).await?;
                self.transport.edit_text(dialog, &text, Some(&grid)).await?;
                Ok(LinkOutcome::AwaitingAction(dialog))
            }
            (
                LinkStage::AwaitingConfirmation | LinkStage::AwaitingExecution,
                Payload::Action {
                    candidate,
                    label,
                    verb,
                },
            ) => {
                if self.sessions.finish(dialog).await.is_none() {
                    return Err(RelayError::SessionExpired);
                }
                if verb != UNLINK_VERB {
                    return Err(RelayError::UnrecognizedAction {
                        verb,
                        payload: candidate.to_string(),
                    });
                }

                self.store.dissociate(&candidate).await?;
                info!("Unlinked {}", candidate);
                self.transport
                    .edit_text(dialog, &format!("Chat '{}' has been unlinked.", label), None)
                    .await?;
                Ok(LinkOutcome::Unlinked(candidate))
            }
            (stage, payload) => {
                warn!(
                    "Callback {:?} does not fit dialog {:?} at {:?}",
                    payload, dialog, stage
                );
                // The dialog is shown as expired, so stop tracking it too.
                self.sessions.finish(dialog).await;
                Err(RelayError::SessionExpired)
            }
        }
    }

    /// Start a dialog in `chat` that already knows its candidate.
    async fn show_actions_for(
        &self,
        chat: MasterChatId,
        candidate: QualifiedChatId,
    ) -> RelayResult<LinkOutcome> {
        let label = self.label_for(&candidate).await?;
        let Some(choice) = encode_choice(&candidate, &label) else {
            warn!("Chat id '{}' is too long to offer for linking", candidate);
            return Err(RelayError::NoLinkedChat);
        };

        let (text, grid) = self.actions_for(&candidate, &label, &choice).await?;
        let dialog = self
            .transport
            .send_choices(chat, &text, &grid)
            .await?;
        self.sessions.begin_with_candidate(dialog, &candidate).await;
        Ok(LinkOutcome::AwaitingAction(dialog))
    }

    /// Text and buttons offered once `candidate` is chosen.
    async fn actions_for(
        &self,
        candidate: &QualifiedChatId,
        label: &str,
        choice: &str,
    ) -> RelayResult<(String, ChoiceGrid)> {
        let linked = self.store.master_for(candidate).await?.is_some();
        let url = self
            .transport
            .group_link_url(&encode_start_param(candidate));

        let mut text = format!("You've selected chat '{}'.", label);
        if linked {
            text.push_str("\nThis chat has already been linked.");
        }
        text.push_str("\nWhat would you like to do?");

        let row = if linked {
            vec![
                Choice::link("Relink", url),
                Choice::callback("Unlink", encode_action(choice, UNLINK_VERB)),
                Choice::callback("Cancel", CANCEL),
            ]
        } else {
            vec![Choice::link("Link", url), Choice::callback("Cancel", CANCEL)]
        };
        Ok((text, vec![row]))
    }

    /// Label of a chat as it appears in the chat list, or its id when the
    /// backend does not list it.
    async fn label_for(&self, candidate: &QualifiedChatId) -> RelayResult<String> {
        let Some(backend) = self.slaves.get(candidate.channel()) else {
            return Ok(candidate.to_string());
        };
        let chats = match backend.list_chats().await {
            Ok(chats) => chats,
            Err(e) => {
                warn!("Failed to list chats of '{}': {}", backend.id(), e);
                return Ok(candidate.to_string());
            }
        };

        let linked = self.store.master_for(candidate).await?.is_some();
        Ok(chats
            .iter()
            .find(|c| c.uid == candidate.chat())
            .map(|c| chat_option_label(backend.emoji(), c, linked))
            .unwrap_or_else(|| candidate.to_string()))
    }

    fn chat_list_text(&self) -> String {
        let mut text = String::from("Please choose the chat you want to link with ...\n\nLegend:\n");
        for (glyph, meaning) in [
            (LINK_GLYPH, "Linked"),
            (USER_GLYPH, "User"),
            (GROUP_GLYPH, "Group"),
            (SYSTEM_GLYPH, "System"),
            (UNKNOWN_GLYPH, "Unknown"),
        ] {
            text.push_str(&format!("{}: {}\n", glyph, meaning));
        }
        for backend in self.slaves.iter() {
            text.push_str(&format!("{}: {}\n", backend.emoji(), backend.display_name()));
        }
        text
    }
}
