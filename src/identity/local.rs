//! A local account directory standing in for a hosted identity service.
//!
//! Accounts live in a JSON file (`accounts.json`) with Argon2id PHC
//! password hashes, or purely in memory for tests. The vault key is
//! derived separately from the password, so nothing stored here can
//! decrypt a vault.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{IdentityProvider, Principal, ProviderError};
use crate::crypto::kdf::{generate_salt, Argon2Params};
use crate::errors::{Result, VaultError};
use crate::validation::MIN_SECRET_LEN;

/// One registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    /// Argon2id PHC string.
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// File-backed (or in-memory) identity provider.
pub struct LocalIdentityProvider {
    path: Option<PathBuf>,
    params: Argon2Params,
    /// Keyed by normalized (trimmed, lowercased) email.
    accounts: Mutex<BTreeMap<String, Account>>,
}

impl LocalIdentityProvider {
    /// Open the account directory at `path`, creating nothing until the
    /// first registration.
    pub fn open(path: impl Into<PathBuf>, params: Argon2Params) -> Result<Self> {
        let path = path.into();
        let accounts = if path.exists() {
            let contents = std::fs::read(&path)?;
            serde_json::from_slice(&contents).map_err(|e| {
                VaultError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            params,
            accounts: Mutex::new(accounts),
        })
    }

    /// An empty directory that is never written to disk.
    pub fn in_memory(params: Argon2Params) -> Self {
        Self {
            path: None,
            params,
            accounts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Where accounts are persisted, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, accounts: &BTreeMap<String, Account>) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(accounts)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let parent = path.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent).await?;
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        tokio::fs::write(&tmp_path, &json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        tokio::fs::rename(&tmp_path, path).await
    }

    async fn hash_password(&self, secret: &str) -> std::result::Result<String, ProviderError> {
        let hasher = self.params.hasher(None).map_err(internal)?;
        let secret = Zeroizing::new(secret.to_string());

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::encode_b64(&generate_salt()).map_err(internal)?;
            hasher
                .hash_password(secret.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(internal)
        })
        .await
        .map_err(internal)?
    }

    async fn verify_password(
        &self,
        secret: &str,
        stored_hash: &str,
    ) -> std::result::Result<bool, ProviderError> {
        let secret = Zeroizing::new(secret.to_string());
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash).map_err(internal)?;
            Ok(Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(internal)?
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        secret: &str,
    ) -> std::result::Result<Principal, ProviderError> {
        let key = normalize(email);
        if !key.contains('@') {
            return Err(ProviderError::InvalidEmail);
        }
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(ProviderError::WeakPassword);
        }

        // Hold the lock across hashing so two registrations of the same
        // email cannot both succeed.
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&key) {
            return Err(ProviderError::EmailAlreadyInUse);
        }

        let account = Account {
            uid: Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            password_hash: self.hash_password(secret).await?,
            created_at: Utc::now(),
        };
        let principal = principal_of(&account);

        accounts.insert(key.clone(), account);
        if let Err(e) = self.persist(&accounts).await {
            accounts.remove(&key);
            return Err(ProviderError::Unavailable(format!(
                "cannot write account directory: {e}"
            )));
        }

        info!(principal = %principal.id, "account created");
        Ok(principal)
    }

    async fn authenticate(
        &self,
        email: &str,
        secret: &str,
    ) -> std::result::Result<Principal, ProviderError> {
        let account = self
            .accounts
            .lock()
            .await
            .get(&normalize(email))
            .cloned()
            .ok_or(ProviderError::UserNotFound)?;

        if !self.verify_password(secret, &account.password_hash).await? {
            debug!(principal = %account.uid, "password rejected");
            return Err(ProviderError::WrongPassword);
        }

        Ok(principal_of(&account))
    }

    async fn sign_out(&self, principal: &Principal) -> std::result::Result<(), ProviderError> {
        debug!(principal = %principal.id, "local sign-out");
        Ok(())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn principal_of(account: &Account) -> Principal {
    Principal {
        id: account.uid.clone(),
        email: account.email.clone(),
    }
}

fn internal(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Other {
        code: "auth/internal-error".into(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let provider = LocalIdentityProvider::in_memory(fast_params());
        let created = provider
            .create_account("Alice@Example.com", "correct horse")
            .await
            .unwrap();

        let signed_in = provider
            .authenticate("alice@example.com ", "correct horse")
            .await
            .unwrap();
        assert_eq!(created, signed_in);
    }

    #[tokio::test]
    async fn provider_error_codes() {
        let provider = LocalIdentityProvider::in_memory(fast_params());
        provider
            .create_account("bob@example.com", "password1")
            .await
            .unwrap();

        assert_eq!(
            provider.create_account("bob@example.com", "password2").await,
            Err(ProviderError::EmailAlreadyInUse)
        );
        assert_eq!(
            provider.create_account("carol@example.com", "12345").await,
            Err(ProviderError::WeakPassword)
        );
        assert_eq!(
            provider.create_account("no-at-sign", "password1").await,
            Err(ProviderError::InvalidEmail)
        );
        assert_eq!(
            provider.authenticate("nobody@example.com", "password1").await,
            Err(ProviderError::UserNotFound)
        );
        assert_eq!(
            provider.authenticate("bob@example.com", "password2").await,
            Err(ProviderError::WrongPassword)
        );
    }

    #[tokio::test]
    async fn accounts_survive_reopen_without_plaintext() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.json");

        let provider = LocalIdentityProvider::open(&path, fast_params()).unwrap();
        let created = provider
            .create_account("dana@example.com", "s3cret-pass")
            .await
            .unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("s3cret-pass"));
        assert!(on_disk.contains("$argon2id$"));

        let reopened = LocalIdentityProvider::open(&path, fast_params()).unwrap();
        let principal = reopened
            .authenticate("dana@example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(principal, created);
    }

    #[test]
    fn unreadable_directory_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "not json").unwrap();

        let result = LocalIdentityProvider::open(&path, fast_params());
        assert!(matches!(result, Err(VaultError::ConfigError(_))));
    }
}
