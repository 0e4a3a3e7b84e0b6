//! Credential manager: the password and reset-token lifecycle of a user.
//!
//! The manager never touches the database. It works on one in-memory [`User`]
//! at a time; the caller loads the record, runs it through the hook it needs
//! and persists the result.
//!
//! Hook points:
//! - [`CredentialManager::prepare_new_secret`] before inserting a new user
//! - [`CredentialManager::apply_password_change`] before persisting a changed
//!   password on an existing user
//! - [`CredentialManager::verify_secret`] on login
//! - [`CredentialManager::was_password_changed_after`] when a session token
//!   is presented

use crate::auth::errors::{CredentialError, CredentialResult};
use crate::auth::password;
use crate::auth::reset_token::{self, IssuedResetToken, ResetState};
use crate::database::models::{AuthType, User};
use chrono::{DateTime, Duration, Utc};

/// Backdate applied to `password_changed_at`, in milliseconds, so a session
/// token minted in the same request as the change stays valid.
pub const PASSWORD_CHANGE_SKEW_MS: i64 = 1000;

/// Tunables of the credential manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialConfig {
    /// How long an issued reset token stays valid.
    pub reset_window: Duration,
    /// bcrypt cost factor.
    pub hash_cost: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            reset_window: Duration::minutes(10),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialManager {
    config: CredentialConfig,
}

impl CredentialManager {
    pub fn new(config: CredentialConfig) -> Self {
        Self { config }
    }

    /// Salted, cost-parameterized hash of an already validated password.
    ///
    /// CPU bound; async callers should run it on the blocking pool.
    pub fn hash_secret(&self, plaintext: &str) -> CredentialResult<String> {
        password::hash_secret(plaintext, self.config.hash_cost)
    }

    pub fn validate_strength(&self, plaintext: &str) -> CredentialResult<()> {
        password::validate_strength(plaintext).map_err(CredentialError::from)
    }

    pub fn verify_secret(&self, plaintext: &str, stored_hash: &str) -> bool {
        password::verify_secret(plaintext, stored_hash)
    }

    /// Checks a login attempt against the user's stored hash.
    ///
    /// Federated users and users without a stored hash never match, but still
    /// pay for one hash at the configured cost.
    pub fn verify_user_secret(&self, user: &User, plaintext: &str) -> bool {
        match (&user.auth_type, &user.password_hash) {
            (AuthType::Local, Some(hash)) => self.verify_secret(plaintext, hash),
            _ => self.verify_missing_user(plaintext),
        }
    }

    /// Login check for an email with no account.
    ///
    /// Never matches. Runs one bcrypt hash at the configured cost so the
    /// rejection takes as long as a wrong password against a real account.
    pub fn verify_missing_user(&self, plaintext: &str) -> bool {
        if let Err(e) = self.hash_secret(plaintext) {
            tracing::warn!(error = %e, "Placeholder password hash failed");
        }
        false
    }

    /// Create hook: produces the `password_hash` column for a new user.
    ///
    /// Local users must supply a password that passes the strength rules.
    /// Federated users get no hash and any supplied password is ignored.
    /// `password_changed_at` is never set on creation.
    pub fn prepare_new_secret(
        &self,
        auth_type: AuthType,
        plaintext: Option<&str>,
    ) -> CredentialResult<Option<String>> {
        match auth_type {
            AuthType::Federated => Ok(None),
            AuthType::Local => {
                let plaintext = plaintext.ok_or(CredentialError::MissingPassword)?;
                self.validate_strength(plaintext)?;
                self.hash_secret(plaintext).map(Some)
            }
        }
    }

    /// Write hook for a password change on an existing user.
    ///
    /// Validates, hashes and stamps `password_changed_at` one second before
    /// `now`. The record is left untouched on failure.
    pub fn apply_password_change(
        &self,
        user: &mut User,
        plaintext: &str,
        now: DateTime<Utc>,
    ) -> CredentialResult<()> {
        if !user.auth_type.is_local() {
            return Err(CredentialError::NotLocal);
        }
        self.validate_strength(plaintext)?;
        let hash = self.hash_secret(plaintext)?;

        user.password_hash = Some(hash);
        user.password_changed_at = Some(now - Duration::milliseconds(PASSWORD_CHANGE_SKEW_MS));
        Ok(())
    }

    /// Mints a reset token and records its digest and expiry on the user.
    ///
    /// A token issued while another is pending replaces it. The user is left
    /// untouched when `now + reset_window` is out of range.
    pub fn issue_reset_token(
        &self,
        user: &mut User,
        now: DateTime<Utc>,
    ) -> CredentialResult<IssuedResetToken> {
        let expires_at = now
            .checked_add_signed(self.config.reset_window)
            .ok_or(CredentialError::ExpiryOutOfRange)?;
        let token = reset_token::generate_reset_token()?;

        user.reset_password_token = Some(reset_token::hash_reset_token(&token));
        user.reset_password_token_expiry = Some(expires_at);

        Ok(IssuedResetToken { token, expires_at })
    }

    /// Checks a presented raw reset token and clears the reset fields on success.
    ///
    /// A digest mismatch is [`CredentialError::InvalidToken`]. A matching token
    /// past its expiry is [`CredentialError::ExpiredToken`]; the reset fields
    /// are kept in both cases. The caller persists the cleared fields together
    /// with the new password.
    pub fn consume_reset_token(
        &self,
        user: &mut User,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> CredentialResult<()> {
        let presented = reset_token::hash_reset_token(raw_token);
        match user.reset_password_token.as_deref() {
            Some(stored) if stored == presented => {}
            _ => return Err(CredentialError::InvalidToken),
        }

        match user.reset_password_token_expiry {
            Some(expires_at) if now <= expires_at => {}
            _ => return Err(CredentialError::ExpiredToken),
        }

        self.cancel_reset(user);
        Ok(())
    }

    /// Drops any pending reset token.
    pub fn cancel_reset(&self, user: &mut User) {
        user.reset_password_token = None;
        user.reset_password_token_expiry = None;
    }

    pub fn reset_state(&self, user: &User, now: DateTime<Utc>) -> ResetState {
        match (&user.reset_password_token, user.reset_password_token_expiry) {
            (Some(_), Some(expires_at)) if now <= expires_at => {
                ResetState::ResetPending { expires_at }
            }
            _ => ResetState::NoResetPending,
        }
    }

    /// Whether a session token issued at `issued_at` (seconds since epoch)
    /// predates the user's last password change.
    ///
    /// Users that never changed their password are never invalidated.
    pub fn was_password_changed_after(&self, user: &User, issued_at: i64) -> bool {
        match user.password_changed_at {
            Some(changed_at) => issued_at < changed_at.timestamp(),
            None => false,
        }
    }
}
