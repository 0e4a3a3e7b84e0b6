//! Global application error types.
//!
//! This module defines the service-level error returned by every business
//! operation, so callers can map each failure to a distinct user-facing outcome.

use crate::auth::errors::CredentialError;
use thiserror::Error;

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Password reset token is invalid")]
    InvalidToken,

    #[error("Password reset token has expired")]
    ExpiredToken,

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::WeakPassword(rule) => Self::validation(rule.to_string()),
            CredentialError::MissingPassword => Self::validation(error.to_string()),
            CredentialError::NotLocal => Self::invalid_operation(error.to_string()),
            CredentialError::InvalidToken => Self::InvalidToken,
            CredentialError::ExpiredToken => Self::ExpiredToken,
            CredentialError::Hashing(_)
            | CredentialError::Entropy(_)
            | CredentialError::ExpiryOutOfRange => Self::internal_error(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordRule;

    #[test]
    fn test_credential_error_mapping() {
        let err: ServiceError = CredentialError::WeakPassword(PasswordRule::MissingDigit).into();
        match err {
            ServiceError::Validation { message } => assert!(message.contains("number")),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            ServiceError::from(CredentialError::InvalidToken),
            ServiceError::InvalidToken
        ));
        assert!(matches!(
            ServiceError::from(CredentialError::ExpiredToken),
            ServiceError::ExpiredToken
        ));
        assert!(matches!(
            ServiceError::from(CredentialError::NotLocal),
            ServiceError::InvalidOperation { .. }
        ));
        assert!(matches!(
            ServiceError::from(CredentialError::Entropy("os rng".into())),
            ServiceError::InternalError { .. }
        ));
        assert!(matches!(
            ServiceError::from(CredentialError::ExpiryOutOfRange),
            ServiceError::InternalError { .. }
        ));
    }
}
