//! Password-based key derivation using Argon2id.
//!
//! The account password never touches storage. It is stretched into a
//! 32-byte master key with a per-vault random salt that lives in the
//! (cleartext, HMAC-protected) blob header.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest memory cost accepted from a stored header, in KiB (1 GB).
pub const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Largest iteration count accepted from a stored header.
pub const MAX_ITERATIONS: u32 = 16;

/// Largest parallelism accepted from a stored header.
pub const MAX_PARALLELISM: u32 = 16;

/// Configurable Argon2id parameters.
///
/// Stored verbatim in every blob header so a vault is always reopened
/// with the parameters it was sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject parameters below the safety floor.
    pub fn check(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.iterations < 1 {
            return Err(VaultError::KeyDerivationFailed(
                "Argon2 iterations must be at least 1".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(VaultError::KeyDerivationFailed(
                "Argon2 parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Default upper bounds for parameters read back from storage.
    pub const CEILING: Self = Self {
        memory_kib: MAX_MEMORY_KIB,
        iterations: MAX_ITERATIONS,
        parallelism: MAX_PARALLELISM,
    };

    /// Field-wise maximum of two parameter sets.
    pub fn max(self, other: Self) -> Self {
        Self {
            memory_kib: self.memory_kib.max(other.memory_kib),
            iterations: self.iterations.max(other.iterations),
            parallelism: self.parallelism.max(other.parallelism),
        }
    }

    /// Like [`check`](Self::check), but also reject any field above `ceiling`.
    ///
    /// Stored headers are not authenticated until the key exists, so their
    /// parameters must be bounded before any derivation runs.
    pub fn check_within(&self, ceiling: &Self) -> Result<()> {
        self.check()?;
        if self.memory_kib > ceiling.memory_kib
            || self.iterations > ceiling.iterations
            || self.parallelism > ceiling.parallelism
        {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 params {}/{}/{} exceed the limit {}/{}/{}",
                self.memory_kib,
                self.iterations,
                self.parallelism,
                ceiling.memory_kib,
                ceiling.iterations,
                ceiling.parallelism
            )));
        }
        Ok(())
    }

    /// Build an `Argon2id` context, optionally fixing the output length.
    pub fn hasher(&self, output_len: Option<usize>) -> Result<Argon2<'static>> {
        self.check()?;
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            output_len,
        )
        .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Derive a 32-byte master key with explicit Argon2id parameters.
///
/// The same password + salt + params always produce the same key.
pub fn derive_master_key(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    let argon2 = params.hasher(Some(KEY_LEN))?;

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
