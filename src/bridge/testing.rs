//! Test doubles for the master transport and slave backends.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::common::error::{SlaveError, SlaveResult, TransportResult};
use crate::common::types::{ChatSource, MasterChatId, MessageRef, SlaveChat};
use crate::master::transport::{Choice, ChoiceGrid, MasterTransport};
use crate::slave::SlaveBackend;

/// Something the code under test did through the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        id: MessageRef,
        text: String,
        reply_to: Option<MessageRef>,
    },
    Choices {
        id: MessageRef,
        text: String,
        choices: ChoiceGrid,
    },
    Edit {
        target: MessageRef,
        text: String,
        choices: Option<ChoiceGrid>,
    },
}

/// Transport that records every call and hands out increasing message ids.
pub struct RecordingTransport {
    next_id: AtomicI32,
    events: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(100),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<Sent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Sent> {
        self.events.lock().unwrap().last().cloned()
    }

    fn next_ref(&self, chat: MasterChatId) -> MessageRef {
        MessageRef::new(chat, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, event: Sent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl MasterTransport for RecordingTransport {
    async fn send_text(&self, chat: MasterChatId, text: &str) -> TransportResult<MessageRef> {
        let id = self.next_ref(chat);
        self.record(Sent::Text {
            id,
            text: text.to_string(),
            reply_to: None,
        });
        Ok(id)
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> TransportResult<MessageRef> {
        let id = self.next_ref(to.chat);
        self.record(Sent::Text {
            id,
            text: text.to_string(),
            reply_to: Some(to),
        });
        Ok(id)
    }

    async fn send_choices(
        &self,
        chat: MasterChatId,
        text: &str,
        choices: &[Vec<Choice>],
    ) -> TransportResult<MessageRef> {
        let id = self.next_ref(chat);
        self.record(Sent::Choices {
            id,
            text: text.to_string(),
            choices: choices.to_vec(),
        });
        Ok(id)
    }

    async fn edit_text(
        &self,
        target: MessageRef,
        text: &str,
        choices: Option<&[Vec<Choice>]>,
    ) -> TransportResult<()> {
        self.record(Sent::Edit {
            target,
            text: text.to_string(),
            choices: choices.map(|c| c.to_vec()),
        });
        Ok(())
    }

    fn group_link_url(&self, start_param: &str) -> String {
        format!("https://t.me/relay_bot?startgroup={}", start_param)
    }
}

/// Slave backend with a fixed chat list that records what it is sent.
pub struct StubSlave {
    id: String,
    display_name: String,
    emoji: String,
    chats: Vec<SlaveChat>,
    sent: Mutex<Vec<(String, String)>>,
}

impl StubSlave {
    pub fn new(id: &str, emoji: &str, chats: Vec<SlaveChat>) -> Self {
        let mut display_name = id.to_string();
        if let Some(first) = display_name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        Self {
            id: id.to_string(),
            display_name,
            emoji: emoji.to_string(),
            chats,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// `(chat uid, text)` pairs passed to `send`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlaveBackend for StubSlave {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn emoji(&self) -> &str {
        &self.emoji
    }

    async fn list_chats(&self) -> SlaveResult<Vec<SlaveChat>> {
        Ok(self.chats.clone())
    }

    async fn send(&self, chat_uid: &str, text: &str) -> SlaveResult<()> {
        if !self.chats.iter().any(|c| c.uid == chat_uid) {
            return Err(SlaveError::ChatNotFound {
                chat_uid: chat_uid.to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_uid.to_string(), text.to_string()));
        Ok(())
    }
}

/// A slave chat whose alias equals its name.
pub fn chat(uid: &str, name: &str, source: ChatSource) -> SlaveChat {
    SlaveChat {
        uid: uid.to_string(),
        name: name.to_string(),
        alias: name.to_string(),
        source,
    }
}
