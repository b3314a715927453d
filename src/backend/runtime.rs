//! In-memory storage backend
//!
//! This is primarily for non-interactive contexts (command line tools,
//! tests) where the platform's session persistence is unavailable or
//! undesired. Data lives only for the duration of the process.

use std::sync::Arc;

use parking_lot::RwLock;

use super::StorageBackend;

/// In-memory storage backend holding the most recent payload.
///
/// The backend keeps exactly one payload: `write` replaces it, `read`
/// returns it verbatim, `destroy` clears it. Entries never expire;
/// garbage collection is a no-op.
pub struct RuntimeBackend {
    data: Arc<RwLock<Option<String>>>,
}

impl RuntimeBackend {
    /// Create a new runtime backend
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(None)),
        }
    }
}

impl Default for RuntimeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RuntimeBackend {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl StorageBackend for RuntimeBackend {
    fn open(&self, _save_path: &str, _name: &str) -> bool {
        true
    }

    fn read(&self, _id: &str) -> Option<String> {
        self.data.read().clone()
    }

    fn write(&self, _id: &str, data: &str) -> bool {
        *self.data.write() = Some(data.to_owned());
        true
    }

    fn destroy(&self, _id: &str) -> bool {
        *self.data.write() = None;
        true
    }

    fn close(&self) -> bool {
        true
    }

    fn garbage_collect(&self, _max_lifetime: u64) -> bool {
        true
    }
}
