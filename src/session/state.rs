//! Session states and user-facing authentication failure reasons.

use std::fmt;

use crate::identity::{Principal, ProviderError};

/// Why an authentication attempt failed, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    UnknownAccount,
    EmailAlreadyInUse,
    WeakSecret,
    InvalidEmail,
    /// The provider could not be reached or did not answer in time.
    Unavailable,
    /// Anything without a dedicated reason; carries the provider's message.
    Other(String),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => f.write_str("Incorrect password"),
            Self::UnknownAccount => f.write_str("User not found"),
            Self::EmailAlreadyInUse => f.write_str("Email already in use"),
            Self::WeakSecret => f.write_str("Password should be at least 6 characters"),
            Self::InvalidEmail => f.write_str("Invalid email address"),
            Self::Unavailable => f.write_str("Identity provider unavailable, try again"),
            Self::Other(message) => f.write_str(message),
        }
    }
}

impl From<ProviderError> for AuthFailure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::WrongPassword => Self::InvalidCredentials,
            ProviderError::UserNotFound => Self::UnknownAccount,
            ProviderError::EmailAlreadyInUse => Self::EmailAlreadyInUse,
            ProviderError::WeakPassword => Self::WeakSecret,
            ProviderError::InvalidEmail => Self::InvalidEmail,
            ProviderError::Unavailable(_) => Self::Unavailable,
            ProviderError::Other { message, .. } => Self::Other(message),
        }
    }
}

/// Where the session gate currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(Principal),
    AuthError(AuthFailure),
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}
