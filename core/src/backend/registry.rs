use std::collections::HashMap;
use std::sync::Arc;

use super::TransferBackend;

/// Resolves a back-end by its stable string key (spec §9: identification
/// across restarts uses a registry, not a dynamic class lookup).
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn TransferBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, backend: Arc<dyn TransferBackend>) {
        self.backends.insert(backend.key().to_string(), backend);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn TransferBackend>> {
        self.backends.get(key).cloned()
    }
}
