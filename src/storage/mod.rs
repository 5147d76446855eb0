//! Durable blob storage, scoped per principal.
//!
//! The vault store only ever sees opaque sealed bytes; what a backend
//! does with them (files, memory, a browser's local storage) is its own
//! business as long as one principal's blob is never served under
//! another principal's id.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::errors::Result;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Read/write access to one sealed blob per principal.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Return the stored blob, or `None` if this principal has none yet.
    async fn read_blob(&self, principal_id: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the principal's blob. Must not report success until the
    /// bytes are durable.
    async fn write_blob(&self, principal_id: &str, bytes: &[u8]) -> Result<()>;
}
