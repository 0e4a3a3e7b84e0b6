//! User business logic service.
//!
//! Handles registration, credential checks and password changes. Every
//! password write goes through the credential manager hooks before it
//! reaches the repository.

use crate::auth::credentials::CredentialManager;
use crate::auth::errors::CredentialResult;
use crate::auth::models::{ChangePasswordRequest, RegisterRequest};
use crate::database::models::{CreateUser, User};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::utils::validation::validate_request;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct UserService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
    /// Password hashing, verification and change stamping
    credentials: CredentialManager,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    /// * `credentials` - Credential manager built from the loaded configuration
    pub fn new(pool: &'a SqlitePool, credentials: CredentialManager) -> Self {
        Self { pool, credentials }
    }

    /// Registers a new user with full validation.
    ///
    /// # Arguments
    /// * `request` - Registration payload
    ///
    /// # Returns
    /// The newly created User with all fields populated
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures, including weak or missing local passwords
    /// - Duplicate email
    pub async fn create_user(&self, request: RegisterRequest) -> ServiceResult<User> {
        validate_request(&request)?;

        let email = request.email.trim().to_lowercase();
        let repo = UserRepository::new(self.pool);
        if repo.email_exists(&email).await? {
            return Err(ServiceError::already_exists("User with email", &email));
        }

        let manager = self.credentials.clone();
        let auth_type = request.auth_type;
        let password = request.password;
        let password_hash = run_blocking(move || {
            manager.prepare_new_secret(auth_type, password.as_deref())
        })
        .await?;

        let data = CreateUser {
            id: Uuid::now_v7().to_string(),
            first_name: request.first_name,
            last_name: request.last_name,
            email,
            password_hash,
            auth_type,
            role: request.role,
            phone_number: request.phone_number,
            whatsapp: request.whatsapp,
            contact_email: request.contact_email,
        };

        let user = repo.create_user(data).await?;
        tracing::info!(user_id = %user.id, auth_type = ?user.auth_type, "User registered");
        Ok(user)
    }

    /// Checks an email/password pair.
    ///
    /// # Returns
    /// The matching User
    ///
    /// # Errors
    /// Returns `ServiceError::PermissionDenied` with the same message for an
    /// unknown email, a federated account and a wrong password, and a distinct
    /// message for an inactive account with correct credentials.
    pub async fn authenticate_user(&self, email: &str, password: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let email = email.trim().to_lowercase();

        let manager = self.credentials.clone();
        let password = password.to_string();

        let Some(user) = repo.get_user_by_email(&email).await? else {
            tracing::debug!("Login attempt for unknown email");
            run_blocking(move || Ok(manager.verify_missing_user(&password))).await?;
            return Err(invalid_credentials());
        };

        let (user, matched) = run_blocking(move || {
            let matched = manager.verify_user_secret(&user, &password);
            Ok((user, matched))
        })
        .await?;

        if !matched {
            tracing::info!(user_id = %user.id, "Login rejected: invalid credentials");
            return Err(invalid_credentials());
        }

        if !user.is_active {
            return Err(ServiceError::permission_denied("User account is inactive"));
        }

        Ok(user)
    }

    /// Changes the password of a logged-in user.
    ///
    /// # Arguments
    /// * `user_id` - User ID (UUID format)
    /// * `request` - Current and new password
    ///
    /// # Returns
    /// The user as persisted, with the new hash and change time
    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> ServiceResult<User> {
        validate_request(&request)?;

        let user = self.get_user_required(user_id).await?;
        if !user.auth_type.is_local() {
            return Err(ServiceError::invalid_operation(
                "Federated accounts have no local password",
            ));
        }

        let manager = self.credentials.clone();
        let user = run_blocking(move || {
            let mut user = user;
            if !manager.verify_user_secret(&user, &request.current_password) {
                return Ok(None);
            }
            manager.apply_password_change(&mut user, &request.new_password, Utc::now())?;
            Ok(Some(user))
        })
        .await?
        .ok_or_else(|| ServiceError::permission_denied("Current password is incorrect"))?;

        self.persist_password(&user).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(user)
    }

    /// Retrieves a user by ID with existence verification.
    ///
    /// # Errors
    /// Returns `ServiceError::NotFound` if user doesn't exist
    pub async fn get_user_required(&self, id: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        Ok(user)
    }

    async fn persist_password(&self, user: &User) -> ServiceResult<()> {
        let (Some(hash), Some(changed_at)) = (&user.password_hash, user.password_changed_at) else {
            return Err(ServiceError::internal_error(
                "Password change produced no hash",
            ));
        };

        let repo = UserRepository::new(self.pool);
        if !repo.update_password(&user.id, hash, changed_at).await? {
            return Err(ServiceError::not_found("User", &user.id));
        }
        Ok(())
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::permission_denied("Invalid email or password")
}

/// Runs CPU-bound credential work (bcrypt) on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> CredentialResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::internal_error(format!("Credential task failed: {}", e)))?
        .map_err(ServiceError::from)
}
