//! Credential records stored inside a vault.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A plaintext password held in memory.
///
/// Zeroized on drop and redacted from `Debug`, so a record can be logged
/// or printed with `{:?}` without leaking the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext. Call sites are the only places a secret
    /// leaves this wrapper.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([redacted])")
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A candidate credential submitted by the user, not yet validated.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub website: String,
    pub username: String,
    pub secret: SecretValue,
}

impl NewCredential {
    pub fn new(
        website: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<SecretValue>,
    ) -> Self {
        Self {
            website: website.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }
}

/// A stored website / username / password triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Stable identity, independent of position in the list.
    pub id: Uuid,
    pub website: String,
    pub username: String,
    pub secret: SecretValue,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// The website's host, used as the display key.
    ///
    /// Falls back to the raw website string for records that predate
    /// URL validation.
    pub fn host(&self) -> String {
        Url::parse(&self.website)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.website.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(website: &str) -> CredentialRecord {
        CredentialRecord {
            id: Uuid::new_v4(),
            website: website.into(),
            username: "alice".into(),
            secret: SecretValue::new("hunter2"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn host_is_display_key() {
        assert_eq!(record("https://mail.example.com/inbox").host(), "mail.example.com");
    }

    #[test]
    fn debug_output_never_contains_secret() {
        let rendered = format!("{:?}", record("https://example.com"));
        assert!(!rendered.contains("hunter2"), "{rendered}");
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn secret_serializes_as_plain_string() {
        let json = serde_json::to_value(record("https://example.com")).unwrap();
        assert_eq!(json["secret"], "hunter2");
        assert!(json.get("created_at").is_some());
    }
}
