//! Password reset token generation and hashing.
//!
//! Only the SHA-256 digest of a reset token is ever stored. The raw value is
//! handed to the caller once, for delivery over an out-of-band channel.

use crate::auth::errors::{CredentialError, CredentialResult};
use chrono::{DateTime, Utc};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::fmt;

/// Random bytes per reset token (256 bits).
pub const RESET_TOKEN_BYTES: usize = 32;

/// Raw reset token returned by issuance, with the moment it stops being valid.
#[derive(Clone)]
pub struct IssuedResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedResetToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Reset state of a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    NoResetPending,
    ResetPending { expires_at: DateTime<Utc> },
}

/// Draws a new raw token from the OS random source, hex encoded.
pub fn generate_reset_token() -> CredentialResult<String> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CredentialError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Lowercase hex SHA-256 digest of a raw token, as stored on the account.
pub fn hash_reset_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}
