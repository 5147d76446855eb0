//! Field-scoped input validation shared by the vault and the session gate.
//!
//! Every check reports the *first* invalid field so the caller can point
//! the user at exactly one input.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Minimum account password length accepted before contacting the provider.
pub const MIN_SECRET_LEN: usize = 6;

/// The user-facing input a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Website,
    Username,
    Secret,
    Email,
    Confirmation,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Website => "website",
            Self::Username => "username",
            Self::Secret => "secret",
            Self::Email => "email",
            Self::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}

/// A user-correctable input error scoped to one field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid"))
}

/// Check a website string: must be an absolute URL with a scheme and host.
pub fn validate_website(website: &str) -> Result<Url, ValidationError> {
    if website.trim().is_empty() {
        return Err(ValidationError::new(Field::Website, "website is required"));
    }

    let url = Url::parse(website.trim())
        .map_err(|e| ValidationError::new(Field::Website, format!("not a URL ({e})")))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ValidationError::new(
            Field::Website,
            "URL must include a host (e.g. https://example.com)",
        )),
    }
}

/// Check a new credential candidate in the order website → username → secret.
pub fn validate_candidate(
    website: &str,
    username: &str,
    secret: &str,
) -> Result<(), ValidationError> {
    validate_website(website)?;

    if username.trim().is_empty() {
        return Err(ValidationError::new(
            Field::Username,
            "username is required",
        ));
    }

    if secret.is_empty() {
        return Err(ValidationError::new(Field::Secret, "password is required"));
    }

    Ok(())
}

/// Pre-validate account credentials before they reach the identity provider.
///
/// `confirmation` is `Some` only for registration. Order of checks:
/// secret length, confirmation match, email pattern.
pub fn validate_account_form(
    email: &str,
    secret: &str,
    confirmation: Option<&str>,
) -> Result<(), ValidationError> {
    if secret.is_empty() {
        return Err(ValidationError::new(Field::Secret, "Password is required"));
    }
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(ValidationError::new(
            Field::Secret,
            format!("Password must be at least {MIN_SECRET_LEN} characters"),
        ));
    }

    if let Some(confirmation) = confirmation {
        use subtle::ConstantTimeEq;
        let matches: bool = secret.as_bytes().ct_eq(confirmation.as_bytes()).into();
        if !matches {
            return Err(ValidationError::new(
                Field::Confirmation,
                "Passwords do not match",
            ));
        }
    }

    if email.trim().is_empty() {
        return Err(ValidationError::new(Field::Email, "Email is required"));
    }
    if !email_pattern().is_match(email) {
        return Err(ValidationError::new(Field::Email, "Email is invalid"));
    }

    Ok(())
}
