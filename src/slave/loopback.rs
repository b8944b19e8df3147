//! Loopback slave backend.
//!
//! Exposes a fixed set of chats from configuration and echoes every message
//! sent to one of them back into the inbound queue, as if the chat had
//! answered. Useful for exercising linking and routing without a real
//! messaging network.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::common::error::{SlaveError, SlaveResult};
use crate::common::messages::SlaveMessage;
use crate::common::types::{ChatMember, ChatSource, SlaveChat};
use crate::config::types::LoopbackConfig;

use super::SlaveBackend;

/// Channel id of the loopback backend.
pub const LOOPBACK_ID: &str = "loopback";

/// Sender name used for echoes into group chats.
const ECHO_MEMBER: &str = "Loopback";

pub struct LoopbackSlave {
    chats: Vec<SlaveChat>,
    inbound_tx: mpsc::UnboundedSender<SlaveMessage>,
}

impl LoopbackSlave {
    pub fn new(chats: Vec<SlaveChat>, inbound_tx: mpsc::UnboundedSender<SlaveMessage>) -> Self {
        Self { chats, inbound_tx }
    }

    /// Build from configuration. Chats with an invalid type were rejected by
    /// validation; any that slip through are listed as unknown.
    pub fn from_config(
        config: &LoopbackConfig,
        inbound_tx: mpsc::UnboundedSender<SlaveMessage>,
    ) -> Self {
        let chats = config
            .chats
            .iter()
            .map(|chat| SlaveChat {
                uid: chat.uid.clone(),
                name: chat.name.clone(),
                alias: chat.alias.clone().unwrap_or_else(|| chat.name.clone()),
                source: ChatSource::from_name(&chat.chat_type).unwrap_or(ChatSource::Unknown),
            })
            .collect();
        Self::new(chats, inbound_tx)
    }
}

#[async_trait]
impl SlaveBackend for LoopbackSlave {
    fn id(&self) -> &str {
        LOOPBACK_ID
    }

    fn display_name(&self) -> &str {
        "Loopback"
    }

    fn emoji(&self) -> &str {
        "🔁"
    }

    async fn list_chats(&self) -> SlaveResult<Vec<SlaveChat>> {
        Ok(self.chats.clone())
    }

    async fn send(&self, chat_uid: &str, text: &str) -> SlaveResult<()> {
        let Some(chat) = self.chats.iter().find(|c| c.uid == chat_uid) else {
            warn!("Loopback chat '{}' does not exist", chat_uid);
            return Err(SlaveError::ChatNotFound {
                chat_uid: chat_uid.to_string(),
            });
        };

        let member = (chat.source == ChatSource::Group).then(|| ChatMember {
            name: ECHO_MEMBER.to_string(),
            alias: ECHO_MEMBER.to_string(),
        });

        let echo = SlaveMessage {
            channel_id: LOOPBACK_ID.to_string(),
            channel_emoji: self.emoji().to_string(),
            chat: chat.clone(),
            member,
            text: text.to_string(),
        };

        debug!("Loopback echo into '{}': {}", chat_uid, text);
        self.inbound_tx.send(echo).map_err(|e| SlaveError::Unavailable {
            message: format!("inbound queue closed: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::LoopbackChatConfig;

    fn make_config() -> LoopbackConfig {
        LoopbackConfig {
            enabled: true,
            chats: vec![
                LoopbackChatConfig {
                    uid: "alice".to_string(),
                    name: "Alice".to_string(),
                    alias: None,
                    chat_type: "user".to_string(),
                },
                LoopbackChatConfig {
                    uid: "crew".to_string(),
                    name: "Crew".to_string(),
                    alias: Some("The Crew".to_string()),
                    chat_type: "group".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_list_chats_from_config() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let slave = LoopbackSlave::from_config(&make_config(), tx);

        let chats = slave.list_chats().await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].alias, "Alice");
        assert_eq!(chats[1].alias, "The Crew");
        assert_eq!(chats[1].source, ChatSource::Group);
    }

    #[tokio::test]
    async fn test_send_echoes_into_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slave = LoopbackSlave::from_config(&make_config(), tx);

        slave.send("crew", "ping").await.unwrap();

        let echo = rx.recv().await.unwrap();
        assert_eq!(echo.origin().to_string(), "loopback.crew");
        assert_eq!(echo.text, "ping");
        assert_eq!(echo.member.unwrap().name, "Loopback");
    }

    #[tokio::test]
    async fn test_send_to_unknown_chat() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let slave = LoopbackSlave::from_config(&make_config(), tx);

        let result = slave.send("bob", "hi").await;
        assert!(matches!(result, Err(SlaveError::ChatNotFound { chat_uid }) if chat_uid == "bob"));
    }

    #[tokio::test]
    async fn test_send_with_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let slave = LoopbackSlave::from_config(&make_config(), tx);

        assert!(matches!(
            slave.send("alice", "hi").await,
            Err(SlaveError::Unavailable { .. })
        ));
    }
}
