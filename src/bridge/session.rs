//! Session tracker for in-flight link dialogs.
//!
//! Dialogs are keyed by the interactive message that shows them. Once a
//! candidate chat is chosen, the candidate id is indexed back to its dialog so
//! the group-side `/start` can find it. Both kinds of key live in one table
//! behind one lock, distinguished by [`SessionKey`].

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::common::types::{MessageRef, QualifiedChatId};

/// Stage of a link dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    AwaitingChatChoice,
    AwaitingConfirmation,
    AwaitingExecution,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// The interactive message showing a dialog.
    Dialog(MessageRef),
    /// A candidate chat waiting for group-side completion.
    Candidate(QualifiedChatId),
}

#[derive(Debug, Clone, Copy)]
enum SessionValue {
    Stage(LinkStage),
    Dialog(MessageRef),
}

#[derive(Debug)]
struct SessionEntry {
    value: SessionValue,
    created_at: Instant,
}

/// In-memory table of link dialogs.
#[derive(Debug)]
pub struct SessionTracker {
    entries: Mutex<HashMap<SessionKey, SessionEntry>>,
    ttl: Option<Duration>,
}

impl SessionTracker {
    /// Create a tracker. With a TTL, dialogs older than it behave as if
    /// they were never started.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Track a new dialog waiting for a chat choice.
    pub async fn begin(&self, dialog: MessageRef) {
        let mut entries = self.entries.lock().await;
        self.purge_expired(&mut entries);
        entries.insert(
            SessionKey::Dialog(dialog),
            SessionEntry {
                value: SessionValue::Stage(LinkStage::AwaitingChatChoice),
                created_at: Instant::now(),
            },
        );
    }

    /// Track a new dialog whose chat is already known, waiting for the
    /// final action.
    pub async fn begin_with_candidate(&self, dialog: MessageRef, candidate: &QualifiedChatId) {
        let mut entries = self.entries.lock().await;
        self.purge_expired(&mut entries);
        let now = Instant::now();
        entries.insert(
            SessionKey::Dialog(dialog),
            SessionEntry {
                value: SessionValue::Stage(LinkStage::AwaitingExecution),
                created_at: now,
            },
        );
        entries.insert(
            SessionKey::Candidate(candidate.clone()),
            SessionEntry {
                value: SessionValue::Dialog(dialog),
                created_at: now,
            },
        );
    }

    /// Current stage of a dialog, or None if it is not tracked.
    pub async fn stage(&self, dialog: MessageRef) -> Option<LinkStage> {
        let entries = self.entries.lock().await;
        self.live_stage(&entries, dialog)
    }

    /// Record the chosen candidate and move the dialog from
    /// `AwaitingChatChoice` through `AwaitingConfirmation` to
    /// `AwaitingExecution`. Returns false if the dialog was not waiting for a
    /// choice, in which case nothing changes.
    pub async fn choose(&self, dialog: MessageRef, candidate: &QualifiedChatId) -> bool {
        let mut entries = self.entries.lock().await;
        if self.live_stage(&entries, dialog) != Some(LinkStage::AwaitingChatChoice) {
            return false;
        }

        for stage in [LinkStage::AwaitingConfirmation, LinkStage::AwaitingExecution] {
            if let Some(entry) = entries.get_mut(&SessionKey::Dialog(dialog)) {
                entry.value = SessionValue::Stage(stage);
            }
            debug!("Dialog {:?} -> {:?}", dialog, stage);
        }

        let created_at = entries
            .get(&SessionKey::Dialog(dialog))
            .map(|e| e.created_at)
            .unwrap_or_else(Instant::now);
        entries.insert(
            SessionKey::Candidate(candidate.clone()),
            SessionEntry {
                value: SessionValue::Dialog(dialog),
                created_at,
            },
        );
        true
    }

    /// Stop tracking a dialog and every candidate pointing at it. Returns the
    /// stage it was in, so only one of several racing callers sees Some.
    pub async fn finish(&self, dialog: MessageRef) -> Option<LinkStage> {
        let mut entries = self.entries.lock().await;
        let stage = self.live_stage(&entries, dialog);
        entries.remove(&SessionKey::Dialog(dialog));
        entries.retain(|_, entry| !matches!(entry.value, SessionValue::Dialog(d) if d == dialog));
        stage
    }

    /// Claim the dialog waiting on `candidate`, removing the candidate entry
    /// and its dialog. Returns None if no live dialog waits on it.
    pub async fn take_candidate(&self, candidate: &QualifiedChatId) -> Option<MessageRef> {
        let mut entries = self.entries.lock().await;
        let key = SessionKey::Candidate(candidate.clone());
        let dialog = match entries.get(&key) {
            Some(SessionEntry {
                value: SessionValue::Dialog(dialog),
                ..
            }) => *dialog,
            _ => return None,
        };

        let live = self.live_stage(&entries, dialog).is_some();
        entries.remove(&key);
        entries.remove(&SessionKey::Dialog(dialog));
        entries.retain(|_, entry| !matches!(entry.value, SessionValue::Dialog(d) if d == dialog));
        live.then_some(dialog)
    }

    /// Number of tracked keys, dialogs and candidates together.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn live_stage(
        &self,
        entries: &HashMap<SessionKey, SessionEntry>,
        dialog: MessageRef,
    ) -> Option<LinkStage> {
        match entries.get(&SessionKey::Dialog(dialog)) {
            Some(SessionEntry {
                value: SessionValue::Stage(stage),
                created_at,
            }) if !self.is_expired(*created_at) => Some(*stage),
            _ => None,
        }
    }

    fn is_expired(&self, created_at: Instant) -> bool {
        self.ttl
            .map(|ttl| created_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    fn purge_expired(&self, entries: &mut HashMap<SessionKey, SessionEntry>) {
        if self.ttl.is_none() {
            return;
        }
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry.created_at));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired session entries", purged);
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(None)
    }
}
