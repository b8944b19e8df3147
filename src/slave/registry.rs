use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::SlaveBackend;

/// Registry of all connected slave backends, keyed by channel id.
///
/// Iteration follows channel id order so chat lists render the same way
/// every time.
#[derive(Default)]
pub struct SlaveRegistry {
    backends: BTreeMap<String, Arc<dyn SlaveBackend>>,
}

impl SlaveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous backend with the same id.
    pub fn register(&mut self, backend: Arc<dyn SlaveBackend>) {
        info!(
            "Registered slave channel '{}' ({} {})",
            backend.id(),
            backend.emoji(),
            backend.display_name()
        );
        self.backends.insert(backend.id().to_string(), backend);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SlaveBackend>> {
        self.backends.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.backends.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SlaveBackend>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
