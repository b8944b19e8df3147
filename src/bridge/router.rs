//! Message routing between the master and slave backends.
//!
//! Slave messages go to the master chat linked with their origin, or to the
//! operator's own chat when there is none; the latter are logged so a reply
//! can find its way back. Master messages go to the slave chat linked with
//! their group, or to the origin of the message they reply to.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::common::error::{RelayError, RelayResult, SlaveError};
use crate::common::messages::{MasterMessage, SlaveMessage};
use crate::common::types::{is_private_chat, MasterChatId, MessageRef, QualifiedChatId};
use crate::master::transport::MasterTransport;
use crate::slave::SlaveRegistry;
use crate::store::AssociationStore;

use super::formatter::RelayFormatter;

pub struct MessageRouter {
    store: Arc<dyn AssociationStore>,
    slaves: Arc<SlaveRegistry>,
    transport: Arc<dyn MasterTransport>,
    formatter: RelayFormatter,
    operator: MasterChatId,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn AssociationStore>,
        slaves: Arc<SlaveRegistry>,
        transport: Arc<dyn MasterTransport>,
        formatter: RelayFormatter,
        operator: MasterChatId,
    ) -> Self {
        Self {
            store,
            slaves,
            transport,
            formatter,
            operator,
        }
    }

    /// Deliver a slave message to the master. Sends exactly once.
    pub async fn deliver(&self, msg: &SlaveMessage) -> RelayResult<MessageRef> {
        let origin = msg.origin();

        match self.store.master_for(&origin).await? {
            Some(master) => {
                let body = self.formatter.linked(msg);
                let sent = self.transport.send_text(master, &body).await?;
                info!("Slave -> Master [{} -> {}]: {}", origin, master, body);
                Ok(sent)
            }
            None => {
                let body = self.formatter.unlinked(msg);
                let sent = self.transport.send_text(self.operator, &body).await?;
                self.store.log_message(sent, &origin).await?;
                info!("Slave -> Master [{} -> operator]: {}", origin, body);
                Ok(sent)
            }
        }
    }

    /// Forward a master message to its slave chat, replying with the error
    /// text when that fails.
    pub async fn handle_master_message(&self, msg: &MasterMessage) -> RelayResult<QualifiedChatId> {
        match self.forward_to_slave(msg).await {
            Ok(target) => Ok(target),
            Err(e) => {
                if e.is_user_facing() {
                    warn!("Master message {:?} not forwarded: {}", msg.id, e);
                } else {
                    error!("Master message {:?} not forwarded: {}", msg.id, e);
                }
                self.transport.reply_text(msg.id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// Resolve the slave chat for a master message and send it there.
    pub async fn forward_to_slave(&self, msg: &MasterMessage) -> RelayResult<QualifiedChatId> {
        let target = self.resolve_target(msg).await?;
        let backend = self
            .slaves
            .get(target.channel())
            .ok_or_else(|| RelayError::ChannelNotFound {
                channel: target.channel().to_string(),
            })?;

        backend
            .send(target.chat(), &msg.text)
            .await
            .map_err(|e| match e {
                SlaveError::ChatNotFound { .. } => RelayError::ChatNotFoundInChannel {
                    chat: target.clone(),
                },
                other => RelayError::Slave(other),
            })?;

        info!("Master -> Slave [{} -> {}]: {}", msg.chat(), target, msg.text);
        Ok(target)
    }

    async fn resolve_target(&self, msg: &MasterMessage) -> RelayResult<QualifiedChatId> {
        let private = msg.chat() == self.operator || is_private_chat(msg.chat());
        let target = if !private {
            self.store.slave_for(msg.chat()).await?
        } else if let Some(reply_to) = msg.reply_to {
            self.store.logged_origin(reply_to).await?
        } else {
            None
        };

        debug!("Master message {:?} resolved to {:?}", msg.id, target);
        target.ok_or(RelayError::UnknownRecipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{chat, RecordingTransport, Sent, StubSlave};
    use crate::common::types::{ChatMember, ChatSource};
    use crate::store::MemoryStore;

    const OPERATOR: MasterChatId = 42;
    const GROUP: MasterChatId = -1001;

    struct Fixture {
        router: MessageRouter,
        store: Arc<MemoryStore>,
        transport: Arc<RecordingTransport>,
        wechat: Arc<StubSlave>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new(100));
        let transport = Arc::new(RecordingTransport::new());
        let wechat = Arc::new(StubSlave::new(
            "wechat",
            "💬",
            vec![
                chat("s1", "Book Club", ChatSource::Group),
                chat("alice", "Alice", ChatSource::User),
            ],
        ));
        let mut registry = SlaveRegistry::new();
        registry.register(wechat.clone());

        let router = MessageRouter::new(
            store.clone(),
            Arc::new(registry),
            transport.clone(),
            RelayFormatter::default(),
            OPERATOR,
        );
        Fixture {
            router,
            store,
            transport,
            wechat,
        }
    }

    fn qid(s: &str) -> QualifiedChatId {
        QualifiedChatId::parse(s).unwrap()
    }

    fn from_bob(text: &str) -> SlaveMessage {
        SlaveMessage {
            channel_id: "wechat".to_string(),
            channel_emoji: "💬".to_string(),
            chat: chat("s1", "Book Club", ChatSource::Group),
            member: Some(ChatMember {
                name: "Bob".to_string(),
                alias: "Bob".to_string(),
            }),
            text: text.to_string(),
        }
    }

    fn from_alice(text: &str) -> SlaveMessage {
        SlaveMessage {
            channel_id: "wechat".to_string(),
            channel_emoji: "💬".to_string(),
            chat: chat("alice", "Alice", ChatSource::User),
            member: None,
            text: text.to_string(),
        }
    }

    fn master(chat: MasterChatId, reply_to: Option<MessageRef>, text: &str) -> MasterMessage {
        MasterMessage {
            id: MessageRef::new(chat, 7),
            reply_to,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unlinked_group_message_goes_to_operator_and_is_logged() {
        let f = fixture();

        let sent = f.router.deliver(&from_bob("see you at 8")).await.unwrap();

        assert_eq!(sent.chat, OPERATOR);
        assert_eq!(
            f.transport.events(),
            vec![Sent::Text {
                id: sent,
                text: "💬👥 [Book Club] Bob:\nsee you at 8".to_string(),
                reply_to: None,
            }]
        );
        assert_eq!(
            f.store.logged_origin(sent).await.unwrap(),
            Some(qid("wechat.s1"))
        );
    }

    #[tokio::test]
    async fn test_reply_to_forwarded_message_reaches_origin() {
        let f = fixture();
        let forwarded = f.router.deliver(&from_bob("see you at 8")).await.unwrap();

        let target = f
            .router
            .handle_master_message(&master(OPERATOR, Some(forwarded), "hello"))
            .await
            .unwrap();

        assert_eq!(target, qid("wechat.s1"));
        assert_eq!(
            f.wechat.sent(),
            vec![("s1".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_linked_messages_skip_the_log() {
        let f = fixture();
        f.store.associate(GROUP, &qid("wechat.s1")).await.unwrap();
        f.store.associate(-2002, &qid("wechat.alice")).await.unwrap();

        let group_sent = f.router.deliver(&from_bob("hi all")).await.unwrap();
        let direct_sent = f.router.deliver(&from_alice("hi you")).await.unwrap();

        assert_eq!(group_sent.chat, GROUP);
        assert_eq!(direct_sent.chat, -2002);
        let texts: Vec<String> = f
            .transport
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Bob:\nhi all", "hi you"]);
        assert_eq!(f.store.logged_origin(group_sent).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_link_state_decides_destination() {
        let f = fixture();
        let msg = from_alice("ping");

        let before = f.router.deliver(&msg).await.unwrap();
        assert_eq!(before.chat, OPERATOR);

        f.store.associate(GROUP, &msg.origin()).await.unwrap();
        let linked = f.router.deliver(&msg).await.unwrap();
        assert_eq!(linked.chat, GROUP);

        f.store.dissociate(&msg.origin()).await.unwrap();
        let after = f.router.deliver(&msg).await.unwrap();
        assert_eq!(after.chat, OPERATOR);
    }

    #[tokio::test]
    async fn test_group_message_goes_to_linked_chat() {
        let f = fixture();
        f.store.associate(GROUP, &qid("wechat.alice")).await.unwrap();

        let target = f
            .router
            .handle_master_message(&master(GROUP, None, "on my way"))
            .await
            .unwrap();
        assert_eq!(target, qid("wechat.alice"));
        assert_eq!(
            f.wechat.sent(),
            vec![("alice".to_string(), "on my way".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let f = fixture();

        let plain = f
            .router
            .handle_master_message(&master(OPERATOR, None, "hello?"))
            .await;
        assert!(matches!(plain, Err(RelayError::UnknownRecipient)));

        let unlinked_group = f
            .router
            .handle_master_message(&master(GROUP, None, "hello?"))
            .await;
        assert!(matches!(unlinked_group, Err(RelayError::UnknownRecipient)));

        let stale_reply = f
            .router
            .handle_master_message(&master(OPERATOR, Some(MessageRef::new(OPERATOR, 3)), "hi"))
            .await;
        assert!(matches!(stale_reply, Err(RelayError::UnknownRecipient)));

        assert_eq!(
            f.transport.last(),
            Some(Sent::Text {
                id: MessageRef::new(OPERATOR, 102),
                text: "Unknown recipient.".to_string(),
                reply_to: Some(MessageRef::new(OPERATOR, 7)),
            })
        );
        assert!(f.wechat.sent().is_empty());
    }

    #[tokio::test]
    async fn test_admin_private_chat_routes_by_reply() {
        let f = fixture();
        let admin_chat: MasterChatId = 7;
        let earlier = MessageRef::new(admin_chat, 3);
        f.store.log_message(earlier, &qid("wechat.alice")).await.unwrap();

        let target = f
            .router
            .handle_master_message(&master(admin_chat, Some(earlier), "on my way"))
            .await
            .unwrap();
        assert_eq!(target, qid("wechat.alice"));

        let plain = f
            .router
            .handle_master_message(&master(admin_chat, None, "hello?"))
            .await;
        assert!(matches!(plain, Err(RelayError::UnknownRecipient)));
    }

    #[tokio::test]
    async fn test_missing_channel() {
        let f = fixture();
        f.store.associate(GROUP, &qid("matrix.room")).await.unwrap();

        let result = f
            .router
            .handle_master_message(&master(GROUP, None, "hi"))
            .await;
        assert!(matches!(result, Err(RelayError::ChannelNotFound { channel }) if channel == "matrix"));
        assert!(matches!(
            f.transport.last(),
            Some(Sent::Text { text, .. }) if text == "Internal error: Channel not found."
        ));
    }

    #[tokio::test]
    async fn test_missing_chat_in_channel() {
        let f = fixture();
        f.store.associate(GROUP, &qid("wechat.gone")).await.unwrap();

        let result = f
            .router
            .handle_master_message(&master(GROUP, None, "hi"))
            .await;
        assert!(matches!(
            result,
            Err(RelayError::ChatNotFoundInChannel { chat }) if chat == qid("wechat.gone")
        ));
        assert!(matches!(
            f.transport.last(),
            Some(Sent::Text { text, .. }) if text == "Internal error: Chat not found in channel."
        ));
    }
}
