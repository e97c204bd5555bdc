use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ValidationError};
use super::jwt::JwtService;
use super::lockout::LockoutPolicy;
use super::metrics::{record_login_attempt, LoginOutcome};
use super::policy::PolicyService;
use super::store::{LoginGate, StoreError, UserStore};
use crate::models::{normalize_email, User};
use crate::utils::{dummy_hash, hash_password, verify_password, Password, PasswordHashString};

/// A freshly authenticated identity and its session token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtService,
    lockout: LockoutPolicy,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtService, lockout: LockoutPolicy) -> Self {
        Self {
            users,
            jwt,
            lockout,
        }
    }

    pub async fn register(
        &self,
        organization_id: Uuid,
        email: &str,
        password: String,
    ) -> Result<AuthSession, ServiceError> {
        PolicyService::validate_password(&password)
            .map_err(|e| ServiceError::Validation(ValidationError::WeakPassword(e)))?;

        let email = normalize_email(email);

        if self
            .users
            .find_user_by_email(organization_id, &email)
            .await?
            .is_some()
        {
            return Err(ServiceError::EmailExists);
        }

        let password_hash = hash_blocking(Password::new(password)).await?;
        let user = User::new(organization_id, email, password_hash.into_string());

        self.users.create_user(&user).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => ServiceError::EmailExists,
            other => other.into(),
        })?;

        tracing::info!(
            user_id = %user.id,
            organization_id = %user.organization_id,
            "User registered"
        );

        let token = self.issue_token(&user)?;
        Ok(AuthSession { user, token })
    }

    pub async fn login(
        &self,
        organization_id: Uuid,
        email: &str,
        password: String,
    ) -> Result<AuthSession, ServiceError> {
        let password = Password::new(password);
        let email = normalize_email(email);

        let user = match self.users.find_user_by_email(organization_id, &email).await? {
            Some(user) => user,
            None => {
                // Same hash cost as a wrong password, result ignored.
                let _ = verify_blocking(password, dummy_hash().clone()).await;
                record_login_attempt(LoginOutcome::InvalidCredentials);
                tracing::warn!(%organization_id, "Login failed: unknown account");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        if let LoginGate::Locked { remaining_seconds } =
            self.users.open_login_attempt(user.id).await?
        {
            return Err(self.locked(&user, remaining_seconds));
        }

        let matches = verify_blocking(password, PasswordHashString::new(user.password_hash.clone()))
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, "Stored password hash is unusable: {}", e);
                ServiceError::InvalidCredentials
            })?;

        if !matches {
            let status = self
                .users
                .check_and_update_lockout(user.id, &self.lockout)
                .await?;
            record_login_attempt(LoginOutcome::InvalidCredentials);

            if status.is_locked {
                tracing::warn!(
                    user_id = %user.id,
                    organization_id = %user.organization_id,
                    failed_attempts = status.failed_attempts,
                    lock_seconds = status.remaining_seconds,
                    "Account locked after repeated failed logins"
                );
            } else {
                tracing::warn!(
                    user_id = %user.id,
                    organization_id = %user.organization_id,
                    failed_attempts = status.failed_attempts,
                    "Login failed: wrong password"
                );
            }
            return Err(ServiceError::InvalidCredentials);
        }

        // A lock engaged by concurrent failures while this password was
        // being verified still wins.
        if let LoginGate::Locked { remaining_seconds } = self.users.record_login(user.id).await? {
            return Err(self.locked(&user, remaining_seconds));
        }
        record_login_attempt(LoginOutcome::Success);
        tracing::info!(
            user_id = %user.id,
            organization_id = %user.organization_id,
            "User logged in"
        );

        let token = self.issue_token(&user)?;
        Ok(AuthSession { user, token })
    }

    fn locked(&self, user: &User, remaining_seconds: i64) -> ServiceError {
        record_login_attempt(LoginOutcome::Locked);
        tracing::warn!(
            user_id = %user.id,
            organization_id = %user.organization_id,
            lock_seconds = remaining_seconds,
            "Login rejected: account locked"
        );
        ServiceError::AccountLocked { remaining_seconds }
    }

    fn issue_token(&self, user: &User) -> Result<String, ServiceError> {
        self.jwt
            .issue(user.id, user.organization_id, &user.email, user.role())
            .map_err(ServiceError::Internal)
    }
}

async fn hash_blocking(password: Password) -> Result<PasswordHashString, ServiceError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(e.into()))?
        .map_err(ServiceError::Internal)
}

async fn verify_blocking(
    password: Password,
    hash: PasswordHashString,
) -> Result<bool, anyhow::Error> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
}
