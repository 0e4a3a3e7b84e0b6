//! Authentication module for managing user credentials and sessions.
//!
//! This module provides the credential manager (password hashing, strength
//! rules, reset tokens, session invalidation by password change) and the
//! service that wires it to the user store and session tokens.

pub mod credentials;
pub mod errors;
pub mod models;
pub mod password;
pub mod reset_token;
pub mod service;

// Re-exports for convenience
pub use credentials::{CredentialConfig, CredentialManager};
pub use errors::CredentialError;
pub use password::PasswordRule;
pub use reset_token::{IssuedResetToken, ResetState};
