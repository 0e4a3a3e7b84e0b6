//! Errors raised by the credential manager.

use crate::auth::password::PasswordRule;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The candidate password breaks one of the strength rules.
    #[error(transparent)]
    WeakPassword(#[from] PasswordRule),

    #[error("Password is required for local accounts")]
    MissingPassword,

    #[error("Account does not authenticate with a local password")]
    NotLocal,

    #[error("Password reset token is invalid")]
    InvalidToken,

    /// The token matched but its validity window has passed.
    #[error("Password reset token has expired")]
    ExpiredToken,

    /// The configured reset window pushes the expiry past the representable range.
    #[error("Password reset expiry is out of range")]
    ExpiryOutOfRange,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Secure random source unavailable: {0}")]
    Entropy(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;
