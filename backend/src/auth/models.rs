//! Data structures for authentication-related requests and responses.
//!
//! This module defines the payloads for registration, login, password changes
//! and the password reset flow, used for data transfer within the
//! authentication flow.

use crate::database::models::{AuthType, User, UserRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

const REDACTED: &str = "<redacted>";

/// Registration request payload
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "First name must be between 1-255 characters"
    ))]
    pub first_name: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Last name must be between 1-255 characters"
    ))]
    pub last_name: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    /// Required for local accounts, ignored for federated ones.
    pub password: Option<String>,

    #[serde(default)]
    pub auth_type: AuthType,

    #[serde(default)]
    pub role: UserRole,

    pub phone_number: Option<String>,
    pub whatsapp: Option<String>,

    #[validate(email(message = "Contact email must be a valid email"))]
    pub contact_email: Option<String>,
}

/// Login request payload
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response containing the session token and user info
#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserInfo,
    pub expires_in: u64, // Token expiration in seconds
}

/// User information returned to the client
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub auth_type: AuthType,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            auth_type: user.auth_type,
        }
    }
}

/// Password change for a logged-in user
#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
}

/// Password reset using a token delivered out of band
#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("auth_type", &self.auth_type)
            .field("role", &self.role)
            .field("phone_number", &self.phone_number)
            .field("whatsapp", &self.whatsapp)
            .field("contact_email", &self.contact_email)
            .finish()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &REDACTED)
            .field("user", &self.user)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePasswordRequest")
            .field("current_password", &REDACTED)
            .field("new_password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPasswordRequest")
            .field("token", &REDACTED)
            .field("new_password", &REDACTED)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let change = ChangePasswordRequest {
            current_password: "Str0ng!Pass".to_string(),
            new_password: "Newer1!Pass".to_string(),
        };
        let reset = ResetPasswordRequest {
            token: "a1b2c3d4e5f6".to_string(),
            new_password: "Newer1!Pass".to_string(),
        };
        let login = LoginRequest {
            email: "ada@example.com".to_string(),
            password: "Str0ng!Pass".to_string(),
        };

        for rendered in [
            format!("{:?}", change),
            format!("{:?}", reset),
            format!("{:?}", login),
        ] {
            assert!(rendered.contains(REDACTED), "{rendered}");
            assert!(!rendered.contains("Str0ng!Pass"), "{rendered}");
            assert!(!rendered.contains("Newer1!Pass"), "{rendered}");
            assert!(!rendered.contains("a1b2c3d4e5f6"), "{rendered}");
        }
        assert!(format!("{:?}", login).contains("ada@example.com"));
    }

    #[test]
    fn test_register_debug_redacts_password() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "password": "Str0ng!Pass"
        }))
        .unwrap();

        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("Str0ng!Pass"));
        assert!(rendered.contains("Some(\"<redacted>\")"));
        assert!(rendered.contains("ada@example.com"));
    }
}
