//! Cryptographic primitives for SecureVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF-based record key and HMAC key derivation (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_master_key, generate_salt, Argon2Params};
pub use keys::{derive_hmac_key, derive_record_key, MasterKey};
