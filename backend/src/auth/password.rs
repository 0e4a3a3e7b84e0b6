//! Password strength rules and bcrypt hashing.

use crate::auth::errors::{CredentialError, CredentialResult};
use thiserror::Error;

/// Minimum number of characters in a local password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A strength rule the candidate password failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordRule {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one number")]
    MissingDigit,
    #[error("Password must contain at least one special character")]
    MissingSymbol,
}

/// Checks the strength rules in order and reports the first one that fails.
///
/// Length is counted in characters, not bytes. Any character that is neither
/// alphanumeric nor whitespace counts as a symbol.
pub fn validate_strength(password: &str) -> Result<(), PasswordRule> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordRule::TooShort);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PasswordRule::MissingLowercase);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PasswordRule::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordRule::MissingDigit);
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err(PasswordRule::MissingSymbol);
    }
    Ok(())
}

/// Hashes a password with bcrypt at the given cost.
///
/// Every call draws a fresh salt, so hashing the same password twice gives
/// two different strings.
pub fn hash_secret(password: &str, cost: u32) -> CredentialResult<String> {
    bcrypt::hash(password, cost).map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Checks a candidate password against a stored bcrypt hash.
///
/// A mismatch is `false`. So is a stored value that bcrypt cannot parse.
pub fn verify_secret(password: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(password, stored_hash) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_password_validation() {
        assert!(validate_strength("Str0ng!Pass").is_ok());

        assert_eq!(validate_strength("short1!"), Err(PasswordRule::TooShort));
        assert_eq!(
            validate_strength("alllowercase1!"),
            Err(PasswordRule::MissingUppercase)
        );
        assert_eq!(
            validate_strength("ALLUPPER1!"),
            Err(PasswordRule::MissingLowercase)
        );
        assert_eq!(
            validate_strength("NoDigitsHere!"),
            Err(PasswordRule::MissingDigit)
        );
        assert_eq!(
            validate_strength("NoSymbol123"),
            Err(PasswordRule::MissingSymbol)
        );
    }

    #[test]
    fn test_length_counts_characters() {
        // 7 characters, more than 8 bytes
        assert_eq!(validate_strength("Ää1!ßxé"), Err(PasswordRule::TooShort));
        assert!(validate_strength("Ää1!ßxéy").is_ok());
    }

    #[test]
    fn test_rule_messages_name_the_rule() {
        assert!(PasswordRule::TooShort.to_string().contains("8 characters"));
        assert!(PasswordRule::MissingSymbol.to_string().contains("special"));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_secret("Str0ng!Pass", TEST_COST).unwrap();

        assert_ne!(hash, "Str0ng!Pass");
        assert!(verify_secret("Str0ng!Pass", &hash));
        assert!(!verify_secret("Newer1!Pass", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_secret("Str0ng!Pass", TEST_COST).unwrap();
        let second = hash_secret("Str0ng!Pass", TEST_COST).unwrap();
        let other = hash_secret("Newer1!Pass", TEST_COST).unwrap();

        assert_ne!(first, second);
        assert_ne!(first, other);
        assert!(verify_secret("Str0ng!Pass", &second));
    }

    #[test]
    fn test_verify_malformed_hash_is_false() {
        assert!(!verify_secret("Str0ng!Pass", "not-a-bcrypt-hash"));
        assert!(!verify_secret("Str0ng!Pass", ""));
    }
}
