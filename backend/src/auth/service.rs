//! Core business logic for the authentication system.
//!
//! Login, password changes, the password reset flow and session token
//! authentication. Session tokens are rejected once the user's password has
//! changed after they were issued.

use crate::auth::credentials::CredentialManager;
use crate::auth::models::*;
use crate::auth::reset_token::{IssuedResetToken, hash_reset_token};
use crate::config::Config;
use crate::database::models::User;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::services::user_service::{UserService, run_blocking};
use crate::utils::jwt::{Claims, JwtUtils};
use crate::utils::validation::validate_request;
use chrono::Utc;
use sqlx::SqlitePool;

/// Authentication service for handling login, token generation and password resets
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    jwt_utils: JwtUtils,
    credentials: CredentialManager,
    user_service: UserService<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance
    pub fn new(pool: &'a SqlitePool, config: &Config) -> ServiceResult<Self> {
        let jwt_utils = JwtUtils::new(config)?;
        let credentials = CredentialManager::new(config.credentials());
        let user_service = UserService::new(pool, credentials.clone());

        Ok(AuthService {
            pool,
            jwt_utils,
            credentials,
            user_service,
        })
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<User> {
        self.user_service.create_user(request).await
    }

    /// Authenticate user and generate a session token
    pub async fn login(&self, login_request: LoginRequest) -> ServiceResult<LoginResponse> {
        validate_request(&login_request)?;

        let user = self
            .user_service
            .authenticate_user(&login_request.email, &login_request.password)
            .await?;

        let access_token = self.jwt_utils.generate_token(user.id.clone(), user.role)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            access_token,
            user: UserInfo::from(&user),
            expires_in: self.jwt_utils.expires_in_seconds(),
        })
    }

    /// Change the password of the session owner and hand back a fresh session.
    ///
    /// Sessions issued before the change stop authenticating; the returned
    /// token is issued after the change and stays valid.
    pub async fn change_password(
        &self,
        claims: &Claims,
        request: ChangePasswordRequest,
    ) -> ServiceResult<LoginResponse> {
        let user = self
            .user_service
            .change_password(claims.user_id(), request)
            .await?;

        let access_token = self.jwt_utils.generate_token(user.id.clone(), user.role)?;

        Ok(LoginResponse {
            access_token,
            user: UserInfo::from(&user),
            expires_in: self.jwt_utils.expires_in_seconds(),
        })
    }

    /// Issue a password reset token for the given email.
    ///
    /// Returns `None` for unknown emails and federated accounts, so callers can
    /// answer identically either way. The raw token in the result must only be
    /// delivered out of band.
    pub async fn request_password_reset(
        &self,
        request: ForgotPasswordRequest,
    ) -> ServiceResult<Option<IssuedResetToken>> {
        validate_request(&request)?;

        let repo = UserRepository::new(self.pool);
        let email = request.email.trim().to_lowercase();
        let Some(mut user) = repo.get_user_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        if !user.auth_type.is_local() || !user.is_active {
            tracing::info!(user_id = %user.id, "Password reset not available for account");
            return Ok(None);
        }

        let issued = self.credentials.issue_reset_token(&mut user, Utc::now())?;
        let (Some(token_hash), Some(expires_at)) = (
            user.reset_password_token.as_deref(),
            user.reset_password_token_expiry,
        ) else {
            return Err(ServiceError::internal_error("Reset token was not recorded"));
        };

        if !repo.set_reset_token(&user.id, token_hash, expires_at).await? {
            return Err(ServiceError::not_found("User", &user.id));
        }

        tracing::info!(
            user_id = %user.id,
            expires_at = %issued.expires_at,
            "Password reset token issued"
        );
        Ok(Some(issued))
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    /// - `ServiceError::InvalidToken` for an unknown or already used token,
    ///   including losing a race against a concurrent reset with the same token
    /// - `ServiceError::ExpiredToken` for a matching token past its expiry
    /// - `ServiceError::Validation` for a weak new password
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<User> {
        validate_request(&request)?;

        let repo = UserRepository::new(self.pool);
        let token_hash = hash_reset_token(&request.token);
        let mut user = repo
            .get_user_by_reset_token(&token_hash)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        let now = Utc::now();
        if let Err(e) = self
            .credentials
            .consume_reset_token(&mut user, &request.token, now)
        {
            tracing::info!(user_id = %user.id, "Password reset rejected: {}", e);
            return Err(e.into());
        }

        let manager = self.credentials.clone();
        let new_password = request.new_password;
        let user = run_blocking(move || {
            let mut user = user;
            manager.apply_password_change(&mut user, &new_password, now)?;
            Ok(user)
        })
        .await?;

        let (Some(password_hash), Some(changed_at)) =
            (user.password_hash.as_deref(), user.password_changed_at)
        else {
            return Err(ServiceError::internal_error("Password reset produced no hash"));
        };

        if !repo
            .complete_password_reset(&user.id, &token_hash, password_hash, changed_at)
            .await?
        {
            tracing::info!(user_id = %user.id, "Password reset token already consumed");
            return Err(ServiceError::InvalidToken);
        }

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(user)
    }

    /// Cancel any pending password reset for a user.
    pub async fn cancel_password_reset(&self, user_id: &str) -> ServiceResult<bool> {
        let repo = UserRepository::new(self.pool);
        let cleared = repo.clear_reset_token(user_id).await?;
        if cleared {
            tracing::info!(user_id = %user_id, "Password reset cancelled");
        }
        Ok(cleared)
    }

    /// Authenticate a bearer session token.
    ///
    /// Verifies signature and expiry, then rejects tokens of missing or
    /// inactive users and tokens issued before the last password change.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Claims> {
        let claims = self.jwt_utils.validate_token(token)?;

        let repo = UserRepository::new(self.pool);
        let user = repo
            .get_user_by_id(claims.user_id())
            .await?
            .ok_or_else(|| ServiceError::permission_denied("User no longer exists"))?;

        if !user.is_active {
            return Err(ServiceError::permission_denied("User account is inactive"));
        }

        if self
            .credentials
            .was_password_changed_after(&user, claims.issued_at())
        {
            tracing::info!(user_id = %user.id, "Session rejected: password changed after issue");
            return Err(ServiceError::permission_denied(
                "Password was changed recently, please log in again",
            ));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::database::models::AuthType;
    use crate::database::test_support::test_database;
    use crate::services::user_service::tests::register_request;
    use chrono::Duration;

    async fn register_ada(service: &AuthService<'_>) -> User {
        service
            .register(register_request("ada@example.com", Some("Str0ng!Pass"), AuthType::Local))
            .await
            .unwrap()
    }

    fn login_request(password: &str) -> LoginRequest {
        LoginRequest {
            email: "ada@example.com".to_string(),
            password: password.to_string(),
        }
    }

    fn forgot_request() -> ForgotPasswordRequest {
        ForgotPasswordRequest {
            email: "ada@example.com".to_string(),
        }
    }

    fn reset_request(token: &str, new_password: &str) -> ResetPasswordRequest {
        ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_password_change_invalidates_older_sessions() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        let jwt_utils = JwtUtils::new(&config).unwrap();
        let user = register_ada(&service).await;

        let login = service.login(login_request("Str0ng!Pass")).await.unwrap();
        let claims = service.authenticate(&login.access_token).await.unwrap();
        assert_eq!(claims.user_id(), user.id);

        // Minted well before the change
        let old_token = jwt_utils
            .generate_token_at(user.id.clone(), user.role, Utc::now() - Duration::seconds(30))
            .unwrap();
        assert!(service.authenticate(&old_token).await.is_ok());

        let changed = service
            .change_password(
                &claims,
                ChangePasswordRequest {
                    current_password: "Str0ng!Pass".to_string(),
                    new_password: "Newer1!Pass".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.authenticate(&old_token).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
        // Issued in the same second as the change
        assert!(service.authenticate(&changed.access_token).await.is_ok());

        let later_token = jwt_utils
            .generate_token_at(user.id.clone(), user.role, Utc::now() + Duration::seconds(5))
            .unwrap();
        assert!(service.authenticate(&later_token).await.is_ok());

        assert!(service.login(login_request("Str0ng!Pass")).await.is_err());
        assert!(service.login(login_request("Newer1!Pass")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fresh_account_sessions_are_valid() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        let jwt_utils = JwtUtils::new(&config).unwrap();
        let user = register_ada(&service).await;

        // No password change recorded, so even old tokens pass
        let old_token = jwt_utils
            .generate_token_at(user.id.clone(), user.role, Utc::now() - Duration::minutes(30))
            .unwrap();
        assert!(service.authenticate(&old_token).await.is_ok());

        let stranger = jwt_utils
            .generate_token("someone-else".to_string(), user.role)
            .unwrap();
        assert!(service.authenticate(&stranger).await.is_err());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        let user = register_ada(&service).await;
        let session = service.login(login_request("Str0ng!Pass")).await.unwrap();
        let jwt_utils = JwtUtils::new(&config).unwrap();
        let old_token = jwt_utils
            .generate_token_at(user.id.clone(), user.role, Utc::now() - Duration::seconds(30))
            .unwrap();

        let issued = service
            .request_password_reset(forgot_request())
            .await
            .unwrap()
            .unwrap();

        // Only the digest is stored
        let stored = UserRepository::new(db.pool())
            .get_user_by_id(&user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.reset_password_token.as_deref(),
            Some(hash_reset_token(&issued.token).as_str())
        );
        assert_eq!(stored.reset_password_token_expiry, Some(issued.expires_at));

        // Weak password keeps the token usable
        assert!(matches!(
            service
                .reset_password(reset_request(&issued.token, "alllowercase1!"))
                .await,
            Err(ServiceError::Validation { .. })
        ));

        service
            .reset_password(reset_request(&issued.token, "Newer1!Pass"))
            .await
            .unwrap();

        assert!(matches!(
            service
                .reset_password(reset_request(&issued.token, "Another1!Pass"))
                .await,
            Err(ServiceError::InvalidToken)
        ));
        assert!(service.login(login_request("Newer1!Pass")).await.is_ok());
        assert!(service.authenticate(&old_token).await.is_err());
        assert!(service.authenticate(&session.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_reset_token() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        let user = register_ada(&service).await;

        let issued = service
            .request_password_reset(forgot_request())
            .await
            .unwrap()
            .unwrap();

        // Backdate the expiry past the window
        UserRepository::new(db.pool())
            .set_reset_token(
                &user.id,
                &hash_reset_token(&issued.token),
                Utc::now() - Duration::seconds(1),
            )
            .await
            .unwrap();

        assert!(matches!(
            service
                .reset_password(reset_request(&issued.token, "Newer1!Pass"))
                .await,
            Err(ServiceError::ExpiredToken)
        ));
        assert!(matches!(
            service
                .reset_password(reset_request("not-a-token", "Newer1!Pass"))
                .await,
            Err(ServiceError::InvalidToken)
        ));
        assert!(service.login(login_request("Str0ng!Pass")).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_resets_single_winner() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        register_ada(&service).await;

        let issued = service
            .request_password_reset(forgot_request())
            .await
            .unwrap()
            .unwrap();

        let (first, second) = tokio::join!(
            service.reset_password(reset_request(&issued.token, "Newer1!Pass")),
            service.reset_password(reset_request(&issued.token, "Other1!Pass")),
        );

        let outcomes = [first, second];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        let invalid = outcomes
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::InvalidToken)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(invalid, 1);
    }

    #[tokio::test]
    async fn test_reissue_and_cancel_reset() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        let user = register_ada(&service).await;

        let first = service
            .request_password_reset(forgot_request())
            .await
            .unwrap()
            .unwrap();
        let second = service
            .request_password_reset(forgot_request())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(first.token, second.token);
        assert!(matches!(
            service
                .reset_password(reset_request(&first.token, "Newer1!Pass"))
                .await,
            Err(ServiceError::InvalidToken)
        ));

        assert!(service.cancel_password_reset(&user.id).await.unwrap());
        assert!(!service.cancel_password_reset(&user.id).await.unwrap());
        assert!(matches!(
            service
                .reset_password(reset_request(&second.token, "Newer1!Pass"))
                .await,
            Err(ServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_not_issued_for_unknown_or_federated() {
        let db = test_database().await;
        let config = test_config();
        let service = AuthService::new(db.pool(), &config).unwrap();
        service
            .register(register_request("fed@example.com", None, AuthType::Federated))
            .await
            .unwrap();

        assert!(
            service
                .request_password_reset(forgot_request())
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            service
                .request_password_reset(ForgotPasswordRequest {
                    email: "fed@example.com".to_string(),
                })
                .await
                .unwrap()
                .is_none()
        );
    }
}
