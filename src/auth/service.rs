/// Authentication orchestration
///
/// Composes the credential verifier, the token issuer and the refresh-token
/// store into login, refresh and revoke. Every failure path returns before the
/// first write, and refresh rotation is a single atomic store call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::spawn_verify_password;
use crate::auth::refresh_token::{RefreshTokenRecord, RefreshTokenStore};
use crate::error::{AppError, AuthError};

/// Identity the orchestrator authenticates and signs tokens for
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// User lookup contract the orchestrator needs
#[allow(async_fn_in_trait)]
pub trait UserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AppError>;
}

/// Tokens handed back on login and refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub roles: Vec<String>,
}

pub struct AuthService<U, S> {
    users: U,
    tokens: S,
    issuer: TokenIssuer,
}

impl<U, S> AuthService<U, S>
where
    U: UserDirectory,
    S: RefreshTokenStore,
{
    pub fn new(users: U, tokens: S, issuer: TokenIssuer) -> Self {
        Self {
            users,
            tokens,
            issuer,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Authenticate with email and password
    ///
    /// # Errors
    /// `AuthenticationFailed` for an unknown email and for a wrong password alike
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AppError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("Login attempt for unknown email");
                return Err(AuthError::AuthenticationFailed.into());
            }
        };

        if !spawn_verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::AuthenticationFailed.into());
        }

        let access = self.issuer.issue_access_token(&user)?;
        let refresh_token = self.issuer.issue_refresh_token();
        let record = RefreshTokenRecord::new(
            user.id,
            &refresh_token,
            self.issuer.refresh_token_expiry(),
        );
        self.tokens.save(&record).await?;

        tracing::info!(user_id = %user.id, "User logged in successfully");

        Ok(AuthResult {
            token: access.value,
            refresh_token,
            expires_at: access.expires_at,
            roles: user.roles,
        })
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// The presented token is revoked and replaced in one step; reusing it
    /// afterwards fails.
    ///
    /// # Errors
    /// `InvalidToken` when the token is unknown, revoked, expired, lost a
    /// concurrent rotation, or its owner no longer exists
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResult, AppError> {
        let current = match self.tokens.find_by_value(refresh_token).await? {
            Some(record) if record.is_active_at(Utc::now()) => record,
            Some(record) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    state = ?record.state_at(Utc::now()),
                    "Attempt to use inactive refresh token"
                );
                return Err(AuthError::InvalidToken.into());
            }
            None => {
                tracing::warn!("Refresh token not found");
                return Err(AuthError::InvalidToken.into());
            }
        };

        let user = self
            .users
            .find_by_id(current.user_id)
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidToken))?;

        let access = self.issuer.issue_access_token(&user)?;
        let next_token = self.issuer.issue_refresh_token();
        let replacement =
            RefreshTokenRecord::new(user.id, &next_token, self.issuer.refresh_token_expiry());

        if !self.tokens.rotate(current.id, &replacement).await? {
            tracing::warn!(user_id = %user.id, "Refresh token rotated concurrently");
            return Err(AuthError::InvalidToken.into());
        }

        AuditLog::new("ROTATE", "refresh_token", "SUCCESS", "Refresh token rotated")
            .with_resource_id(current.id.to_string())
            .with_user_id(user.id.to_string())
            .emit();

        Ok(AuthResult {
            token: access.value,
            refresh_token: next_token,
            expires_at: access.expires_at,
            roles: user.roles,
        })
    }

    /// Revoke a refresh token
    ///
    /// Returns `false` when the token is unknown. Revoking an already revoked
    /// token still reports `true`.
    pub async fn revoke(&self, refresh_token: &str) -> Result<bool, AppError> {
        let Some(record) = self.tokens.find_by_value(refresh_token).await? else {
            tracing::info!("Revoke requested for unknown refresh token");
            return Ok(false);
        };

        let revoked = self.tokens.mark_revoked(record.id).await?;

        AuditLog::new(
            "REVOKE",
            "refresh_token",
            if revoked { "SUCCESS" } else { "FAILURE" },
            "Refresh token revoked",
        )
        .with_resource_id(record.id.to_string())
        .with_user_id(record.user_id.to_string())
        .emit();

        Ok(revoked)
    }

    /// Garbage-collect expired refresh tokens
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let removed = self.tokens.purge_expired().await?;

        AuditLog::new(
            "PURGE",
            "refresh_token",
            "SUCCESS",
            format!("{} expired refresh tokens removed", removed),
        )
        .emit();

        Ok(removed)
    }
}
