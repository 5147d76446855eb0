//! Sealed blob format and HMAC integrity verification.
//!
//! A sealed vault blob has this layout:
//!
//! ```text
//! [SVLT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][nonce | ciphertext | tag][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`SVLT`): identifies the bytes as a SecureVault blob.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the ciphertext begins.
//! - **Header JSON**: serialized `BlobHeader` (cleartext: salt, KDF
//!   params, owning principal).
//! - **Ciphertext**: AES-256-GCM over the JSON array of records.
//! - **HMAC-SHA256**: 32-byte tag over header + ciphertext bytes.
//!
//! Every structural, integrity or decryption failure is reported as
//! `VaultError::CorruptStore`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::record::CredentialRecord;
use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::kdf::Argon2Params;
use crate::crypto::keys::MasterKey;
use crate::errors::{Result, VaultError};

/// Magic bytes at the start of every blob.
const MAGIC: &[u8; 4] = b"SVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the blob (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// Cleartext metadata at the start of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHeader {
    pub version: u8,

    /// Argon2id salt (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// When this vault was first sealed.
    pub created_at: DateTime<Utc>,

    /// The principal that owns this blob.
    pub principal_id: String,

    /// KDF parameters the master key was derived with.
    pub argon2_params: Argon2Params,
}

impl BlobHeader {
    pub fn new(principal_id: &str, salt: &[u8], argon2_params: Argon2Params) -> Self {
        Self {
            version: CURRENT_VERSION,
            salt: salt.to_vec(),
            created_at: Utc::now(),
            principal_id: principal_id.to_string(),
            argon2_params,
        }
    }
}

/// A blob split into its sections, not yet authenticated.
///
/// Keeps the original header bytes so the HMAC is checked over exactly
/// what was stored.
pub struct RawBlob {
    pub header: BlobHeader,
    pub header_bytes: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub stored_hmac: Vec<u8>,
}

/// Serialize, encrypt and authenticate `records` under `master_key`.
pub fn seal(
    header: &BlobHeader,
    records: &[CredentialRecord],
    master_key: &MasterKey,
) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| VaultError::SerializationError(format!("header: {e}")))?;
    let plaintext = Zeroizing::new(
        serde_json::to_vec(records)
            .map_err(|e| VaultError::SerializationError(format!("records: {e}")))?,
    );

    let mut record_key = master_key.derive_record_key(&header.principal_id)?;
    let ciphertext = encrypt(&record_key, &plaintext);
    record_key.zeroize();
    let ciphertext = ciphertext?;

    let mut hmac_key = master_key.derive_hmac_key()?;
    let hmac_tag = compute_hmac(&hmac_key, &header_bytes, &ciphertext);
    hmac_key.zeroize();
    let hmac_tag = hmac_tag?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        VaultError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let total = PREFIX_LEN + header_bytes.len() + ciphertext.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&ciphertext);
    buf.extend_from_slice(&hmac_tag);
    Ok(buf)
}

/// Split a blob into header, ciphertext and tag.
///
/// Only the structure is checked here; call [`unseal`] to authenticate
/// and decrypt.
pub fn parse(data: &[u8]) -> Result<RawBlob> {
    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err(corrupt("blob too small to be a sealed vault"));
    }

    if &data[0..4] != MAGIC {
        return Err(corrupt("missing SVLT magic bytes"));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(VaultError::CorruptStore(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| corrupt("bad header length"))?,
    );
    let header_len = usize::try_from(header_len_u32)
        .map_err(|_| corrupt("header length exceeds platform address space"))?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .ok_or_else(|| corrupt("header length overflow"))?;
    if header_end + HMAC_LEN > data.len() {
        return Err(corrupt("header length exceeds blob size"));
    }

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let body_end = data.len() - HMAC_LEN;
    let ciphertext = data[header_end..body_end].to_vec();
    let stored_hmac = data[body_end..].to_vec();

    let header: BlobHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| VaultError::CorruptStore(format!("header JSON: {e}")))?;

    Ok(RawBlob {
        header,
        header_bytes,
        ciphertext,
        stored_hmac,
    })
}

/// Verify the HMAC, decrypt and deserialize the records of a parsed blob.
pub fn unseal(raw: &RawBlob, master_key: &MasterKey) -> Result<Vec<CredentialRecord>> {
    let mut hmac_key = master_key.derive_hmac_key()?;
    let verified = verify_hmac(
        &hmac_key,
        &raw.header_bytes,
        &raw.ciphertext,
        &raw.stored_hmac,
    );
    hmac_key.zeroize();
    verified?;

    let mut record_key = master_key.derive_record_key(&raw.header.principal_id)?;
    let plaintext = decrypt(&record_key, &raw.ciphertext);
    record_key.zeroize();
    let plaintext = Zeroizing::new(plaintext?);

    serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::CorruptStore(format!("records JSON: {e}")))
}

/// Compute HMAC-SHA256 over header + ciphertext bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(ciphertext);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the stored tag in constant time (`Mac::verify_slice`).
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    ciphertext: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(ciphertext);

    mac.verify_slice(expected_hmac)
        .map_err(|_| corrupt("HMAC verification failed: wrong key or tampered blob"))
}

fn corrupt(reason: &str) -> VaultError {
    VaultError::CorruptStore(reason.to_string())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
