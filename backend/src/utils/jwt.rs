//! JWT token utilities for session issuance and validation.
//!
//! Provides token creation, signature and expiry validation, and claims
//! access. Whether a token has been invalidated by a password change is
//! decided by the credential manager from the `iat` claim.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::database::models::UserRole;
use crate::errors::ServiceError;

/// JWT Claims structure carried by session tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// User role
    pub role: UserRole,
    /// Token expiration timestamp
    pub exp: usize,
    /// Token issued at timestamp
    pub iat: usize,
}

/// JWT token utility for creating and validating tokens
#[derive(Clone)]
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in_seconds: u64,
    expires_in: Duration,
}

impl JwtUtils {
    /// Create a new JwtUtils instance from the loaded configuration
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        if config.jwt_secret.is_empty() {
            return Err(ServiceError::validation("JWT secret must not be empty"));
        }

        let expires_in = i64::try_from(config.jwt_expires_in_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .filter(|expires_in| *expires_in > Duration::zero())
            .ok_or_else(|| ServiceError::validation("JWT expiry is out of range"))?;

        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Ok(JwtUtils {
            encoding_key,
            decoding_key,
            validation,
            expires_in_seconds: config.jwt_expires_in_seconds,
            expires_in,
        })
    }

    pub fn expires_in_seconds(&self) -> u64 {
        self.expires_in_seconds
    }

    /// Generate a new session token issued now
    pub fn generate_token(&self, user_id: String, role: UserRole) -> Result<String, ServiceError> {
        self.generate_token_at(user_id, role, Utc::now())
    }

    /// Generate a session token with an explicit issue time
    pub fn generate_token_at(
        &self,
        user_id: String,
        role: UserRole,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let exp = issued_at
            .checked_add_signed(self.expires_in)
            .ok_or_else(|| ServiceError::internal_error("Token expiry is out of range"))?;

        let claims = Claims {
            sub: user_id,
            role,
            exp: timestamp_claim(exp)?,
            iat: timestamp_claim(issued_at)?,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {}", e)))
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| ServiceError::permission_denied(format!("Token validation failed: {}", e)))
    }
}

fn timestamp_claim(at: DateTime<Utc>) -> Result<usize, ServiceError> {
    usize::try_from(at.timestamp())
        .map_err(|_| ServiceError::internal_error("Token timestamp is out of range"))
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Issue time in seconds since epoch
    pub fn issued_at(&self) -> i64 {
        self.iat as i64
    }
}
