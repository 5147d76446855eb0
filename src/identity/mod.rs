//! The identity-provider seam.
//!
//! Account creation and password checks belong to an external service.
//! The session gate only sees this trait and a closed set of provider
//! error codes, which it maps once to user-facing `AuthFailure`s.

pub mod local;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use local::LocalIdentityProvider;

/// An identity confirmed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Stable provider-assigned id; scopes the principal's storage.
    pub id: String,
    pub email: String,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// Rejections reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("email already in use")]
    EmailAlreadyInUse,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password too weak")]
    WeakPassword,

    #[error("user not found")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("provider unreachable: {0}")]
    Unavailable(String),

    /// A code this crate has no name for; the provider's message is kept.
    #[error("{message}")]
    Other { code: String, message: String },
}

impl ProviderError {
    /// The stable wire code for this error.
    pub fn code(&self) -> &str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::WeakPassword => "auth/weak-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::Unavailable(_) => "auth/network-request-failed",
            Self::Other { code, .. } => code,
        }
    }

    /// Parse a provider's code/message pair.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        match code {
            "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/weak-password" => Self::WeakPassword,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/wrong-password" | "auth/invalid-credential" => Self::WrongPassword,
            "auth/network-request-failed" => Self::Unavailable(message.into()),
            other => Self::Other {
                code: other.to_string(),
                message: message.into(),
            },
        }
    }
}

/// An external identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account and return its principal.
    async fn create_account(&self, email: &str, secret: &str) -> Result<Principal, ProviderError>;

    /// Check credentials for an existing account.
    async fn authenticate(&self, email: &str, secret: &str) -> Result<Principal, ProviderError>;

    /// End the provider-side session for `principal`.
    async fn sign_out(&self, principal: &Principal) -> Result<(), ProviderError>;
}
