use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::session::AuthFailure;
use crate::validation::ValidationError;

/// All errors that can occur in SecureVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Input errors ---
    #[error("{0}")]
    Validation(#[from] ValidationError),

    // --- Vault errors ---
    #[error("Credential '{0}' not found")]
    NotFound(Uuid),

    #[error("Vault store is corrupt: {0}")]
    CorruptStore(String),

    #[error("Vault has not been loaded (call load first)")]
    VaultNotLoaded,

    #[error("Vault session is closed; sign in again")]
    SessionClosed,

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Session errors ---
    #[error("{0}")]
    Auth(AuthFailure),

    #[error("A sign-in attempt is already in progress")]
    AuthInProgress,

    #[error("Already signed in; sign out first")]
    SessionActive,

    // --- Storage errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage did not respond within {0:?}")]
    StorageTimeout(Duration),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl From<AuthFailure> for VaultError {
    fn from(reason: AuthFailure) -> Self {
        Self::Auth(reason)
    }
}

/// Convenience type alias for SecureVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
