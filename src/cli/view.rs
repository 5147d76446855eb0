//! Display model for the credential list.
//!
//! Which rows show their password is presentation state: it lives here,
//! keyed by record id, and is never written to the vault.

use std::collections::HashSet;

use uuid::Uuid;

use crate::errors::{Result, VaultError};
use crate::vault::CredentialRecord;

/// What a hidden password renders as, regardless of its length.
pub const MASK: &str = "\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}";

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: Uuid,
    pub host: String,
    pub username: String,
    /// The password, or [`MASK`].
    pub secret: String,
    pub added: String,
}

/// A loaded snapshot of the vault plus per-row visibility.
#[derive(Debug, Default)]
pub struct VaultView {
    records: Vec<CredentialRecord>,
    visible: HashSet<Uuid>,
}

impl VaultView {
    /// Every row starts hidden.
    pub fn new(records: Vec<CredentialRecord>) -> Self {
        Self {
            records,
            visible: HashSet::new(),
        }
    }

    /// Flip one row between hidden and shown; returns the new visibility.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool> {
        if !self.records.iter().any(|r| r.id == id) {
            return Err(VaultError::NotFound(id));
        }
        if self.visible.remove(&id) {
            Ok(false)
        } else {
            self.visible.insert(id);
            Ok(true)
        }
    }

    pub fn is_visible(&self, id: Uuid) -> bool {
        self.visible.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows in vault order.
    pub fn rows(&self) -> Vec<Row> {
        self.records
            .iter()
            .map(|r| Row {
                id: r.id,
                host: r.host(),
                username: r.username.clone(),
                secret: if self.is_visible(r.id) {
                    r.secret.expose().to_string()
                } else {
                    MASK.to_string()
                },
                added: r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            })
            .collect()
    }
}
