//! Telegram update handling.
//!
//! Long-polls Telegram for updates and routes them: commands to the linker,
//! plain text to the router, inline button taps back to the linker. Only
//! allowed users can drive the bot; everything else is dropped.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, UpdateKind};
use teloxide::{ApiError, RequestError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bridge::{ChatLinker, MessageRouter};
use crate::common::error::RelayError;
use crate::common::messages::MasterMessage;
use crate::common::types::{MasterChatId, MasterUserId, MessageRef};

use super::commands::{parse_command, Command};
use super::telegram::TelegramTransport;
use super::transport::MasterTransport;

const WELCOME_TEXT: &str =
    "Welcome to relaylink.\n\nSend /link here to link one of your chats with a group.";

/// Long-polling timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

pub struct MasterHandler {
    transport: Arc<TelegramTransport>,
    linker: Arc<ChatLinker>,
    router: Arc<MessageRouter>,
    allowed_users: Vec<MasterUserId>,
}

impl MasterHandler {
    pub fn new(
        transport: Arc<TelegramTransport>,
        linker: Arc<ChatLinker>,
        router: Arc<MessageRouter>,
        allowed_users: Vec<MasterUserId>,
    ) -> Self {
        Self {
            transport,
            linker,
            router,
            allowed_users,
        }
    }

    /// Poll for updates until shutdown is signalled.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Starting Telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let request = self
                .transport
                .bot()
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

            let result = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Telegram polling stopped");
                        break;
                    }
                    continue;
                }

                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = update.id.as_offset();
                        self.handle_update(update.kind).await;
                    }
                }
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    error!("Another bot instance is polling with this token, stopping");
                    break;
                }
                Err(e) => {
                    warn!("Telegram getUpdates failed: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn handle_update(&self, kind: UpdateKind) {
        match kind {
            UpdateKind::Message(msg) => self.handle_message(msg).await,
            UpdateKind::CallbackQuery(query) => self.handle_callback_query(query).await,
            other => debug!("Ignoring update: {:?}", other),
        }
    }

    fn is_allowed(&self, user: MasterUserId) -> bool {
        self.allowed_users.contains(&user)
    }

    async fn handle_message(&self, msg: Message) {
        let Some(user) = msg.from.as_ref().map(|u| u.id.0) else {
            return;
        };
        if !self.is_allowed(user) {
            warn!("Dropping message from unauthorised user {}", user);
            return;
        }
        let Some(text) = msg.text() else {
            debug!("Ignoring non-text message in chat {}", msg.chat.id.0);
            return;
        };

        let master_msg = MasterMessage {
            id: MessageRef::new(msg.chat.id.0, msg.id.0),
            reply_to: msg
                .reply_to_message()
                .map(|r| MessageRef::new(r.chat.id.0, r.id.0)),
            text: text.to_string(),
        };

        match parse_command(text, self.transport.username()) {
            Some(Command::Link) => {
                if let Err(e) = self.linker.handle_link_command(&master_msg).await {
                    self.reply_error(&master_msg, e).await;
                }
            }
            Some(Command::Start { arg }) => self.handle_start(&master_msg, user, arg).await,
            None => {
                // The router replies with the error text itself.
                if let Err(e) = self.router.handle_master_message(&master_msg).await {
                    debug!("Master message not forwarded: {}", e);
                }
            }
        }
    }

    async fn handle_start(&self, msg: &MasterMessage, user: MasterUserId, arg: Option<String>) {
        let private = user_chat(user) == Some(msg.chat());
        match (private, arg) {
            (false, Some(arg)) => match self.linker.complete_group_link(msg.chat(), &arg).await {
                Ok(outcome) => debug!("Group /start in {}: {:?}", msg.chat(), outcome),
                Err(e) => self.reply_error(msg, e).await,
            },
            (true, None) => {
                if let Err(e) = self.transport.send_text(msg.chat(), WELCOME_TEXT).await {
                    error!("Failed to send welcome text: {}", e);
                }
            }
            _ => debug!("Ignoring /start in chat {}", msg.chat()),
        }
    }

    async fn handle_callback_query(&self, query: CallbackQuery) {
        // Stop the client's spinner whatever happens next.
        if let Err(e) = self.transport.bot().answer_callback_query(&query.id).await {
            warn!("Failed to answer callback query: {}", e);
        }

        if !self.is_allowed(query.from.id.0) {
            warn!("Dropping callback from unauthorised user {}", query.from.id.0);
            return;
        }
        let (Some(data), Some(message)) = (query.data.as_deref(), query.message.as_ref()) else {
            return;
        };

        let dialog = MessageRef::new(message.chat().id.0, message.id().0);
        match self.linker.handle_callback(dialog, data).await {
            Ok(outcome) => debug!("Dialog {:?}: {:?}", dialog, outcome),
            Err(e) if e.is_user_facing() => debug!("Dialog {:?}: {}", dialog, e),
            Err(e) => error!("Dialog {:?} failed: {}", dialog, e),
        }
    }

    async fn reply_error(&self, msg: &MasterMessage, e: RelayError) {
        if e.is_user_facing() {
            warn!("Command in chat {} rejected: {}", msg.chat(), e);
        } else {
            error!("Command in chat {} failed: {}", msg.chat(), e);
        }
        if let Err(send_err) = self.transport.reply_text(msg.id, &e.to_string()).await {
            error!("Failed to reply with error: {}", send_err);
        }
    }
}

/// Id of a user's private chat with the bot, which equals the user id.
fn user_chat(user: MasterUserId) -> Option<MasterChatId> {
    MasterChatId::try_from(user).ok()
}
