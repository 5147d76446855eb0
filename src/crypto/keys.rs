//! Sub-key derivation using HKDF-SHA256.
//!
//! From one Argon2id master key we derive:
//! - the **record key** that seals a principal's credential list, bound
//!   to that principal's id;
//! - the **HMAC key** that authenticates the whole blob.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, VaultError};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

/// Derive the AES key for a principal's records.
///
/// `info` is `"securevault-records:<principal_id>"` so a blob copied
/// under another principal's storage slot cannot be opened with that
/// principal's key even if the passwords collide.
pub fn derive_record_key(master_key: &[u8], principal_id: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("securevault-records:{principal_id}");
    hkdf_derive(master_key, info.as_bytes())
}

/// Derive the HMAC key used to authenticate header + ciphertext.
pub fn derive_hmac_key(master_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(master_key, b"securevault-hmac-key")
}

// The master key comes out of Argon2id, so it is used directly as the
// PRK with HKDF's zero salt.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub fn derive_record_key(&self, principal_id: &str) -> Result<[u8; KEY_LEN]> {
        derive_record_key(&self.bytes, principal_id)
    }

    pub fn derive_hmac_key(&self) -> Result<[u8; KEY_LEN]> {
        derive_hmac_key(&self.bytes)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([redacted])")
    }
}
