//! The per-principal credential store.
//!
//! `VaultStore` owns one principal's records, the master key that seals
//! them, and the storage slot they are written through to. It is created
//! by the session gate after the identity provider has confirmed the
//! principal, and closed by it on sign-out.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::kdf::{derive_master_key, generate_salt, Argon2Params, SALT_LEN};
use crate::crypto::keys::MasterKey;
use crate::errors::{Result, VaultError};
use crate::identity::Principal;
use crate::storage::BlobStorage;
use crate::validation::validate_candidate;

use super::format::{self, BlobHeader};
use super::record::{CredentialRecord, NewCredential, SecretValue};

/// Tunables for opening a store.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// KDF parameters for vaults that do not exist yet. Existing vaults
    /// are always reopened with the parameters in their header.
    pub argon2_params: Argon2Params,
    /// Upper bound on any single storage read or write.
    pub io_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            argon2_params: Argon2Params::default(),
            io_timeout: Duration::from_secs(5),
        }
    }
}

/// Master key plus the header it belongs to.
struct VaultKey {
    master: MasterKey,
    header: BlobHeader,
}

/// What the in-memory cache currently holds.
enum Records {
    /// Not loaded yet, or invalidated by a failed storage operation.
    Unloaded,
    Ready(Vec<CredentialRecord>),
    /// The stored blob could not be opened; only `load` and `reset` work.
    Corrupt(String),
}

struct Inner {
    /// `None` once the session has been closed.
    key: Option<VaultKey>,
    records: Records,
}

/// The unlocked vault of one authenticated principal.
pub struct VaultStore {
    principal: Principal,
    storage: Arc<dyn BlobStorage>,
    io_timeout: Duration,
    /// Largest KDF parameters a stored header may ask for.
    kdf_ceiling: Argon2Params,
    /// Set synchronously on sign-out, before the key is wiped.
    revoked: AtomicBool,
    /// Held for the whole validate → mutate → persist sequence, so two
    /// mutations never interleave.
    inner: Mutex<Inner>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Derive the principal's vault key and return a store in the
    /// *unloaded* state.
    ///
    /// The salt and KDF parameters come from the existing blob header if
    /// there is a readable one; otherwise a fresh salt is generated. A
    /// damaged blob does not fail here. It is reported by [`load`](Self::load).
    ///
    /// The header is not authenticated yet, so its salt and KDF parameters
    /// are bounded before use. Out-of-range values count as unreadable.
    pub async fn unlock(
        principal: Principal,
        password: &str,
        storage: Arc<dyn BlobStorage>,
        options: StoreOptions,
    ) -> Result<Self> {
        let existing = with_timeout(options.io_timeout, storage.read_blob(&principal.id)).await?;
        let kdf_ceiling = Argon2Params::CEILING.max(options.argon2_params);

        let header = existing
            .as_deref()
            .filter(|bytes| !bytes.is_empty())
            .and_then(|bytes| format::parse(bytes).ok())
            .map(|raw| raw.header)
            .filter(|header| header.principal_id == principal.id)
            .filter(|header| {
                let usable = kdf_in_range(header, &kdf_ceiling);
                if !usable {
                    warn!(principal = %principal.id, "stored KDF parameters out of range");
                }
                usable
            })
            .unwrap_or_else(|| {
                BlobHeader::new(&principal.id, &generate_salt(), options.argon2_params)
            });

        let master = derive_key_blocking(password, &header).await?;
        debug!(principal = %principal.id, "vault key derived");

        Ok(Self {
            principal,
            storage,
            io_timeout: options.io_timeout,
            kdf_ceiling,
            revoked: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                key: Some(VaultKey { master, header }),
                records: Records::Unloaded,
            }),
        })
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    /// Read and decrypt the principal's blob, replacing the cache.
    ///
    /// No blob (or an empty one) is an empty vault. Anything unreadable
    /// is `CorruptStore`, and the store stays unusable until
    /// [`reset`](Self::reset).
    pub async fn load(&self) -> Result<Vec<CredentialRecord>> {
        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        let Inner { key, records } = &mut *inner;
        let key = key.as_ref().ok_or(VaultError::SessionClosed)?;

        // Storage is the source of truth; drop whatever was cached.
        *records = Records::Unloaded;

        let bytes = self.timed(self.storage.read_blob(&self.principal.id)).await?;
        let loaded = match bytes {
            None => Vec::new(),
            Some(bytes) if bytes.is_empty() => Vec::new(),
            Some(bytes) => match self.open_blob(&bytes, key) {
                Ok(loaded) => loaded,
                Err(VaultError::CorruptStore(reason)) => {
                    warn!(principal = %self.principal.id, %reason, "vault blob is corrupt");
                    *records = Records::Corrupt(reason.clone());
                    return Err(VaultError::CorruptStore(reason));
                }
                Err(other) => return Err(other),
            },
        };

        info!(principal = %self.principal.id, count = loaded.len(), "vault loaded");
        *records = Records::Ready(loaded.clone());
        Ok(loaded)
    }

    /// Validate and append a credential, then write the whole vault.
    pub async fn add(&self, candidate: NewCredential) -> Result<CredentialRecord> {
        validate_candidate(
            &candidate.website,
            &candidate.username,
            candidate.secret.expose(),
        )?;

        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        let Inner { key, records } = &mut *inner;
        let key = key.as_ref().ok_or(VaultError::SessionClosed)?;
        let list = ready_mut(records)?;

        let record = CredentialRecord {
            id: Uuid::new_v4(),
            website: candidate.website,
            username: candidate.username,
            secret: candidate.secret,
            created_at: Utc::now(),
        };
        list.push(record.clone());

        if let Err(e) = self.persist(key, list).await {
            *records = Records::Unloaded;
            return Err(e);
        }

        info!(principal = %self.principal.id, id = %record.id, "credential added");
        Ok(record)
    }

    /// Remove a credential by id, then write the remaining vault.
    ///
    /// Removing an id that is not present (including a second removal of
    /// the same id) fails with `NotFound`.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        let Inner { key, records } = &mut *inner;
        let key = key.as_ref().ok_or(VaultError::SessionClosed)?;
        let list = ready_mut(records)?;

        let pos = list
            .iter()
            .position(|r| r.id == id)
            .ok_or(VaultError::NotFound(id))?;
        list.remove(pos);

        if let Err(e) = self.persist(key, list).await {
            *records = Records::Unloaded;
            return Err(e);
        }

        info!(principal = %self.principal.id, %id, "credential removed");
        Ok(())
    }

    /// Snapshot of all credentials in insertion order.
    pub async fn list(&self) -> Result<Vec<CredentialRecord>> {
        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        ready(&inner.records).map(<[CredentialRecord]>::to_vec)
    }

    /// Number of loaded credentials.
    pub async fn len(&self) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        ready(&inner.records).map(<[CredentialRecord]>::len)
    }

    /// The plaintext secret of one credential. Never touches storage.
    pub async fn reveal(&self, id: Uuid) -> Result<SecretValue> {
        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        ready(&inner.records)?
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.secret.clone())
            .ok_or(VaultError::NotFound(id))
    }

    /// Overwrite the stored blob with an empty vault.
    ///
    /// Destroys whatever was stored, readable or not. Callers must only
    /// invoke this after the user explicitly confirmed it.
    pub async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.ensure_open(&mut inner)?;
        let Inner { key, records } = &mut *inner;
        let key = key.as_ref().ok_or(VaultError::SessionClosed)?;

        *records = Records::Unloaded;
        self.persist(key, &[]).await?;
        *records = Records::Ready(Vec::new());

        warn!(principal = %self.principal.id, "vault reset to empty");
        Ok(())
    }

    /// Mark the store closed without waiting for the lock.
    ///
    /// Every operation that starts afterwards fails with `SessionClosed`
    /// and wipes the key on its way out.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Revoke, then drop the key and every cached record.
    pub async fn close(&self) {
        self.revoke();
        let mut inner = self.inner.lock().await;
        inner.key = None;
        inner.records = Records::Unloaded;
        debug!(principal = %self.principal.id, "vault closed");
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The principal this vault belongs to.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// `false` once the session has been revoked or closed.
    pub fn is_open(&self) -> bool {
        !self.revoked.load(Ordering::SeqCst)
    }

    fn ensure_open(&self, inner: &mut Inner) -> Result<()> {
        if self.revoked.load(Ordering::SeqCst) {
            inner.key = None;
            inner.records = Records::Unloaded;
        }
        if inner.key.is_none() {
            return Err(VaultError::SessionClosed);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    async fn persist(&self, key: &VaultKey, records: &[CredentialRecord]) -> Result<()> {
        let blob = format::seal(&key.header, records, &key.master)?;
        self.timed(self.storage.write_blob(&self.principal.id, &blob))
            .await?;
        debug!(principal = %self.principal.id, bytes = blob.len(), "vault written");
        Ok(())
    }

    fn open_blob(&self, bytes: &[u8], key: &VaultKey) -> Result<Vec<CredentialRecord>> {
        let raw = format::parse(bytes)?;

        if raw.header.principal_id != self.principal.id {
            return Err(VaultError::CorruptStore(
                "blob is sealed for a different principal".into(),
            ));
        }
        if !kdf_in_range(&raw.header, &self.kdf_ceiling) {
            return Err(VaultError::CorruptStore(
                "KDF parameters out of range".into(),
            ));
        }
        if raw.header.salt != key.header.salt
            || raw.header.argon2_params != key.header.argon2_params
        {
            return Err(VaultError::CorruptStore(
                "blob is sealed under a different key".into(),
            ));
        }

        format::unseal(&raw, &key.master)
    }

    async fn timed<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        with_timeout(self.io_timeout, fut).await
    }
}

fn ready(records: &Records) -> Result<&[CredentialRecord]> {
    match records {
        Records::Ready(list) => Ok(list),
        Records::Unloaded => Err(VaultError::VaultNotLoaded),
        Records::Corrupt(reason) => Err(VaultError::CorruptStore(reason.clone())),
    }
}

fn ready_mut(records: &mut Records) -> Result<&mut Vec<CredentialRecord>> {
    match records {
        Records::Ready(list) => Ok(list),
        Records::Unloaded => Err(VaultError::VaultNotLoaded),
        Records::Corrupt(reason) => Err(VaultError::CorruptStore(reason.clone())),
    }
}

fn kdf_in_range(header: &BlobHeader, ceiling: &Argon2Params) -> bool {
    header.salt.len() == SALT_LEN && header.argon2_params.check_within(ceiling).is_ok()
}

async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| VaultError::StorageTimeout(limit))?
}

/// Argon2id is deliberately slow; keep it off the async worker threads.
async fn derive_key_blocking(password: &str, header: &BlobHeader) -> Result<MasterKey> {
    let password = Zeroizing::new(password.to_string());
    let salt = header.salt.clone();
    let params = header.argon2_params;

    let mut bytes = tokio::task::spawn_blocking(move || {
        derive_master_key(password.as_bytes(), &salt, &params)
    })
    .await
    .map_err(|e| VaultError::KeyDerivationFailed(format!("KDF task failed: {e}")))??;

    let master = MasterKey::new(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    Ok(master)
}
