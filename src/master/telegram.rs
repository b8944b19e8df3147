//! Telegram implementation of the master transport.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReplyParameters,
};
use tracing::{info, warn};
use url::Url;

use crate::common::error::{TransportError, TransportResult};
use crate::common::types::{MasterChatId, MessageRef};

use super::transport::{Choice, ChoiceAction, MasterTransport};

pub struct TelegramTransport {
    bot: Bot,
    username: String,
}

impl TelegramTransport {
    /// Verify the token, clear any webhook so long polling works, and
    /// register the bot's commands.
    pub async fn connect(token: &str) -> TransportResult<Self> {
        let bot = Bot::new(token);
        let me = bot.get_me().await?;
        let username = me.username.clone().unwrap_or_default();

        bot.delete_webhook().await?;

        let commands = vec![
            BotCommand::new("link", "Link a chat with this one"),
            BotCommand::new("start", "Start the bot"),
        ];
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!("Failed to register bot commands: {}", e);
        }

        info!("Connected to Telegram as @{}", username);
        Ok(Self { bot, username })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

fn keyboard(choices: &[Vec<Choice>]) -> TransportResult<InlineKeyboardMarkup> {
    let mut rows = Vec::with_capacity(choices.len());
    for row in choices {
        let mut buttons = Vec::with_capacity(row.len());
        for choice in row {
            let button = match &choice.action {
                ChoiceAction::Callback(data) => {
                    InlineKeyboardButton::callback(choice.label.clone(), data.clone())
                }
                ChoiceAction::Link(link) => {
                    let url = Url::parse(link).map_err(|source| TransportError::InvalidLink {
                        url: link.clone(),
                        source,
                    })?;
                    InlineKeyboardButton::url(choice.label.clone(), url)
                }
            };
            buttons.push(button);
        }
        rows.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef::new(msg.chat.id.0, msg.id.0)
}

#[async_trait]
impl MasterTransport for TelegramTransport {
    async fn send_text(&self, chat: MasterChatId, text: &str) -> TransportResult<MessageRef> {
        let sent = self.bot.send_message(ChatId(chat), text).await?;
        Ok(message_ref(&sent))
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> TransportResult<MessageRef> {
        let sent = self
            .bot
            .send_message(ChatId(to.chat), text)
            .reply_parameters(
                ReplyParameters::new(MessageId(to.message)).allow_sending_without_reply(),
            )
            .await?;
        Ok(message_ref(&sent))
    }

    async fn send_choices(
        &self,
        chat: MasterChatId,
        text: &str,
        choices: &[Vec<Choice>],
    ) -> TransportResult<MessageRef> {
        let sent = self
            .bot
            .send_message(ChatId(chat), text)
            .reply_markup(keyboard(choices)?)
            .await?;
        Ok(message_ref(&sent))
    }

    async fn edit_text(
        &self,
        target: MessageRef,
        text: &str,
        choices: Option<&[Vec<Choice>]>,
    ) -> TransportResult<()> {
        let mut request =
            self.bot
                .edit_message_text(ChatId(target.chat), MessageId(target.message), text);
        if let Some(choices) = choices {
            request = request.reply_markup(keyboard(choices)?);
        }
        request.await?;
        Ok(())
    }

    fn group_link_url(&self, start_param: &str) -> String {
        format!("https://t.me/{}?startgroup={}", self.username, start_param)
    }
}
