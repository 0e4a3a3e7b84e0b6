//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these may differ from API-specific models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// How a user proves their identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")] // Store as TEXT in SQLite
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Self-managed password hashed on this server.
    #[default]
    Local,
    /// External identity provider; no local password.
    Federated,
}

impl AuthType {
    pub fn is_local(&self) -> bool {
        matches!(self, AuthType::Local)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Agent,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub auth_type: AuthType,
    pub role: UserRole,
    pub profile_picture: String,
    pub phone_number: Option<String>,
    pub whatsapp: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub id: String,

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

    pub password_hash: Option<String>,
    pub auth_type: AuthType,
    pub role: UserRole,
    pub phone_number: Option<String>,
    pub whatsapp: Option<String>,
    pub contact_email: Option<String>,
}
