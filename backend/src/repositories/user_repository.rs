//! Database repository for user management operations.
//!
//! Provides persistence for users and their credential state. The credential
//! manager works on loaded records; this repository writes its results back.

use crate::database::models::{CreateUser, User};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, auth_type, role, \
     profile_picture, phone_number, whatsapp, contact_email, is_active, password_changed_at, \
     reset_password_token, reset_password_token_expiry, created_at, updated_at";

/// Repository for user database operations.
///
/// Handles all persistence operations for the User entity.
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database.
    ///
    /// # Arguments
    /// * `user` - CreateUser DTO with the password already hashed
    ///
    /// # Returns
    /// The newly created User with all fields populated
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, auth_type, role,
                phone_number, whatsapp, contact_email, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.auth_type)
        .bind(user.role)
        .bind(user.phone_number)
        .bind(user.whatsapp)
        .bind(user.contact_email)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a user by their unique identifier.
    ///
    /// # Arguments
    /// * `id` - User ID (UUID format)
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a user by their email.
    ///
    /// # Arguments
    /// * `email` - Email to search for
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves the user holding a pending reset token.
    ///
    /// # Arguments
    /// * `token_hash` - SHA-256 digest of the presented raw token
    ///
    /// # Returns
    /// `Some(User)` if a user has this digest recorded, expired or not
    pub async fn get_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_password_token = ?"
        ))
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Checks if an email already exists in the system.
    ///
    /// # Arguments
    /// * `email` - Email to check
    ///
    /// # Returns
    /// `true` if a user with this email exists
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Stores a new password hash together with its change time.
    ///
    /// Any pending reset token is dropped in the same statement.
    ///
    /// # Returns
    /// `true` if the user was updated
    pub async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        password_changed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?,
                password_changed_at = ?,
                reset_password_token = NULL,
                reset_password_token_expiry = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(password_changed_at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Records a reset token digest and its expiry, replacing any pending one.
    ///
    /// # Returns
    /// `true` if the user was updated
    pub async fn set_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = ?,
                reset_password_token_expiry = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Drops a pending reset token.
    ///
    /// # Returns
    /// `true` if a pending token was cleared
    pub async fn clear_reset_token(&self, id: &str) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = NULL,
                reset_password_token_expiry = NULL,
                updated_at = ?
            WHERE id = ? AND reset_password_token IS NOT NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Consumes a reset token and stores the new password in one statement.
    ///
    /// The update only applies while `expected_token_hash` is still the
    /// recorded digest, so of two concurrent consumers exactly one succeeds.
    ///
    /// # Returns
    /// `true` if this call consumed the token, `false` if it was already gone
    pub async fn complete_password_reset(
        &self,
        id: &str,
        expected_token_hash: &str,
        password_hash: &str,
        password_changed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?,
                password_changed_at = ?,
                reset_password_token = NULL,
                reset_password_token_expiry = NULL,
                updated_at = ?
            WHERE id = ? AND reset_password_token = ?
            "#,
        )
        .bind(password_hash)
        .bind(password_changed_at)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_token_hash)
        .execute(self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}
