//! Encrypted credential storage.
//!
//! This module provides:
//! - `CredentialRecord`, `NewCredential` and `SecretValue` (`record`)
//! - The sealed blob format with HMAC integrity (`format`)
//! - `VaultStore`, the per-principal add/list/remove/reveal surface (`store`)

pub mod format;
pub mod record;
pub mod store;

pub use format::BlobHeader;
pub use record::{CredentialRecord, NewCredential, SecretValue};
pub use store::{StoreOptions, VaultStore};
