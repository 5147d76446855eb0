//! In-memory blob storage for tests and embedding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::BlobStorage;
use crate::errors::Result;

/// A `HashMap` of principal id to blob. Clones share the same map, which
/// lets a test keep a handle while the vault owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access to the stored bytes (e.g. to simulate tampering).
    pub fn get(&self, principal_id: &str) -> Option<Vec<u8>> {
        self.lock().get(principal_id).cloned()
    }

    pub fn put(&self, principal_id: &str, bytes: Vec<u8>) {
        self.lock().insert(principal_id.to_string(), bytes);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A panic while holding this lock cannot leave the map half-updated.
        self.blobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn read_blob(&self, principal_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get(principal_id))
    }

    async fn write_blob(&self, principal_id: &str, bytes: &[u8]) -> Result<()> {
        self.put(principal_id, bytes.to_vec());
        Ok(())
    }
}
