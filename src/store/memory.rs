//! In-memory association store with an optional JSON snapshot file.
//!
//! When a snapshot path is configured, the full state is loaded on open and
//! rewritten (write to a temp file, then rename) after every association
//! change. Message log entries are written in batches of
//! [`LOG_FLUSH_INTERVAL`], and on [`MemoryStore::flush`].

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::common::error::{StoreError, StoreResult};
use crate::common::types::{MasterChatId, MessageRef, QualifiedChatId};
use crate::config::types::StoreConfig;

use super::AssociationStore;

/// Unsaved message log entries that trigger a snapshot write.
pub const LOG_FLUSH_INTERVAL: usize = 50;

/// A committed master ⇄ slave binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub master: MasterChatId,
    pub slave: QualifiedChatId,
    pub linked_at: DateTime<Utc>,
}

/// A forwarded message that can be replied to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: MessageRef,
    pub origin: QualifiedChatId,
    pub logged_at: DateTime<Utc>,
}

/// On-disk representation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    associations: Vec<Association>,
    message_log: Vec<LogEntry>,
}

#[derive(Debug, Default)]
struct StoreState {
    by_master: HashMap<MasterChatId, Association>,
    by_slave: HashMap<QualifiedChatId, MasterChatId>,
    log: HashMap<MessageRef, LogEntry>,
    /// Insertion order of `log`, oldest first.
    log_order: VecDeque<MessageRef>,
    /// Log entries added since the last snapshot write.
    unsaved_log: usize,
}

impl StoreState {
    fn insert_association(&mut self, association: Association) {
        if let Some(previous_master) = self.by_slave.remove(&association.slave) {
            self.by_master.remove(&previous_master);
        }
        if let Some(previous) = self.by_master.remove(&association.master) {
            self.by_slave.remove(&previous.slave);
        }
        self.by_slave
            .insert(association.slave.clone(), association.master);
        self.by_master.insert(association.master, association);
    }

    fn insert_log(&mut self, entry: LogEntry, limit: usize) {
        let key = entry.message;
        if self.log.insert(key, entry).is_none() {
            self.log_order.push_back(key);
        }
        while self.log_order.len() > limit {
            if let Some(oldest) = self.log_order.pop_front() {
                self.log.remove(&oldest);
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let mut associations: Vec<Association> = self.by_master.values().cloned().collect();
        associations.sort_by_key(|a| a.master);
        let message_log = self
            .log_order
            .iter()
            .filter_map(|key| self.log.get(key).cloned())
            .collect();
        Snapshot {
            associations,
            message_log,
        }
    }
}

/// Association store kept in memory.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
    log_limit: usize,
}

impl MemoryStore {
    /// Create an empty store without persistence.
    pub fn new(log_limit: usize) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            path: None,
            log_limit: log_limit.max(1),
        }
    }

    /// Open the store described by configuration, loading the snapshot file
    /// if one is configured and exists.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        let mut store = Self::new(config.message_log_limit);
        let Some(ref path) = config.path else {
            info!("Association store running in memory only");
            return Ok(store);
        };

        let path = PathBuf::from(path);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let snapshot: Snapshot = serde_json::from_str(&content)?;
                let mut state = StoreState::default();
                for association in snapshot.associations {
                    state.insert_association(association);
                }
                for entry in snapshot.message_log {
                    state.insert_log(entry, store.log_limit);
                }
                info!(
                    "Loaded {} associations and {} log entries from {}",
                    state.by_master.len(),
                    state.log.len(),
                    path.display()
                );
                store.state = RwLock::new(state);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store snapshot at {}, starting empty", path.display());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        }

        store.path = Some(path);
        Ok(store)
    }

    /// All current associations, ordered by master chat id.
    pub async fn associations(&self) -> Vec<Association> {
        self.state.read().await.snapshot().associations
    }

    /// Write pending message log entries to the snapshot file.
    pub async fn flush(&self) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.unsaved_log == 0 {
            return Ok(());
        }
        self.persist(&mut state).await
    }

    /// Write the snapshot file. Called with the write lock held so writes
    /// are never reordered.
    async fn persist(&self, state: &mut StoreState) -> StoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&state.snapshot())?;
        let tmp = temp_path(path);
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        state.unsaved_log = 0;
        debug!("Store snapshot written to {}", path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl AssociationStore for MemoryStore {
    async fn master_for(&self, slave: &QualifiedChatId) -> StoreResult<Option<MasterChatId>> {
        Ok(self.state.read().await.by_slave.get(slave).copied())
    }

    async fn slave_for(&self, master: MasterChatId) -> StoreResult<Option<QualifiedChatId>> {
        Ok(self
            .state
            .read()
            .await
            .by_master
            .get(&master)
            .map(|a| a.slave.clone()))
    }

    async fn associate(&self, master: MasterChatId, slave: &QualifiedChatId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.insert_association(Association {
            master,
            slave: slave.clone(),
            linked_at: Utc::now(),
        });
        self.persist(&mut state).await
    }

    async fn dissociate(&self, slave: &QualifiedChatId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(master) = state.by_slave.remove(slave) else {
            return Ok(false);
        };
        state.by_master.remove(&master);
        self.persist(&mut state).await?;
        Ok(true)
    }

    async fn log_message(
        &self,
        master_message: MessageRef,
        slave: &QualifiedChatId,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.insert_log(
            LogEntry {
                message: master_message,
                origin: slave.clone(),
                logged_at: Utc::now(),
            },
            self.log_limit,
        );
        state.unsaved_log += 1;
        if state.unsaved_log < LOG_FLUSH_INTERVAL {
            return Ok(());
        }
        self.persist(&mut state).await
    }

    async fn logged_origin(
        &self,
        master_message: MessageRef,
    ) -> StoreResult<Option<QualifiedChatId>> {
        Ok(self
            .state
            .read()
            .await
            .log
            .get(&master_message)
            .map(|e| e.origin.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn qid(s: &str) -> QualifiedChatId {
        QualifiedChatId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_associate_is_functional_both_ways() {
        let store = MemoryStore::new(10);
        let a = qid("wechat.a");
        let b = qid("wechat.b");

        assert_ok!(store.associate(-100, &a).await);
        assert_eq!(store.master_for(&a).await.unwrap(), Some(-100));
        assert_eq!(store.slave_for(-100).await.unwrap(), Some(a.clone()));

        // Rebinding the master drops the old slave binding.
        assert_ok!(store.associate(-100, &b).await);
        assert_eq!(store.master_for(&a).await.unwrap(), None);
        assert_eq!(store.master_for(&b).await.unwrap(), Some(-100));

        // Rebinding the slave drops the old master binding.
        assert_ok!(store.associate(-200, &b).await);
        assert_eq!(store.slave_for(-100).await.unwrap(), None);
        assert_eq!(store.slave_for(-200).await.unwrap(), Some(b));
        assert_eq!(store.associations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_link_then_unlink_restores_state() {
        let store = MemoryStore::new(10);
        let chat = qid("loopback.crew");

        assert_eq!(store.master_for(&chat).await.unwrap(), None);
        store.associate(-300, &chat).await.unwrap();
        assert!(store.dissociate(&chat).await.unwrap());

        assert_eq!(store.master_for(&chat).await.unwrap(), None);
        assert_eq!(store.slave_for(-300).await.unwrap(), None);
        assert!(!store.dissociate(&chat).await.unwrap());
    }

    #[tokio::test]
    async fn test_message_log_evicts_oldest() {
        let store = MemoryStore::new(2);
        let chat = qid("loopback.alice");

        for id in 1..=3 {
            store
                .log_message(MessageRef::new(42, id), &chat)
                .await
                .unwrap();
        }

        assert_eq!(store.logged_origin(MessageRef::new(42, 1)).await.unwrap(), None);
        assert_eq!(
            store.logged_origin(MessageRef::new(42, 3)).await.unwrap(),
            Some(chat)
        );
        // Same message id in another chat is a different entry.
        assert_eq!(store.logged_origin(MessageRef::new(7, 3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = StoreConfig {
            path: Some(path.display().to_string()),
            message_log_limit: 10,
        };

        {
            let store = MemoryStore::open(&config).await.unwrap();
            store.associate(-1, &qid("loopback.crew")).await.unwrap();
            store
                .log_message(MessageRef::new(42, 9), &qid("loopback.alice"))
                .await
                .unwrap();
            store.flush().await.unwrap();
        }

        let reopened = MemoryStore::open(&config).await.unwrap();
        assert_eq!(
            reopened.slave_for(-1).await.unwrap(),
            Some(qid("loopback.crew"))
        );
        assert_eq!(
            reopened
                .logged_origin(MessageRef::new(42, 9))
                .await
                .unwrap(),
            Some(qid("loopback.alice"))
        );
    }

    #[tokio::test]
    async fn test_message_log_is_written_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = StoreConfig {
            path: Some(path.display().to_string()),
            message_log_limit: 1000,
        };
        let chat = qid("loopback.alice");

        let store = MemoryStore::open(&config).await.unwrap();
        for id in 1..LOG_FLUSH_INTERVAL as i32 {
            store.log_message(MessageRef::new(42, id), &chat).await.unwrap();
        }
        assert!(!path.exists());

        store
            .log_message(MessageRef::new(42, LOG_FLUSH_INTERVAL as i32), &chat)
            .await
            .unwrap();
        store
            .log_message(MessageRef::new(42, 1000), &chat)
            .await
            .unwrap();
        let reopened = MemoryStore::open(&config).await.unwrap();
        assert_eq!(
            reopened
                .logged_origin(MessageRef::new(42, LOG_FLUSH_INTERVAL as i32))
                .await
                .unwrap(),
            Some(chat.clone())
        );
        assert_eq!(
            reopened.logged_origin(MessageRef::new(42, 1000)).await.unwrap(),
            None
        );

        store.flush().await.unwrap();
        let reopened = MemoryStore::open(&config).await.unwrap();
        assert_eq!(
            reopened.logged_origin(MessageRef::new(42, 1000)).await.unwrap(),
            Some(chat)
        );
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let config = StoreConfig {
            path: Some(path.display().to_string()),
            message_log_limit: 10,
        };
        assert!(matches!(
            MemoryStore::open(&config).await,
            Err(StoreError::Snapshot(_))
        ));
    }
}
