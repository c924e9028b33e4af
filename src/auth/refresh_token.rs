/// Refresh Token Management
///
/// Refresh tokens are:
/// - 64 cryptographically random bytes, base64-encoded, handed to the client
/// - stored only as a SHA-256 digest (never the plaintext)
/// - single-use: a refresh revokes the presented token (rotation)
/// - valid iff not revoked and not yet expired

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

const REFRESH_TOKEN_BYTES: usize = 64;

/// Generate a new refresh-token value
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Hash a refresh token using SHA-256
///
/// Lookups hash the presented value and compare digests.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Lifecycle state of one refresh token; `Revoked` and `Expired` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Revoked,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// New active record for `token`, owned by `user_id`
    pub fn new(user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(token),
            expires_at,
            is_revoked: false,
            created_at: Utc::now(),
        }
    }

    /// Revocation wins over expiry; expiry is derived from the clock, never written
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.is_revoked {
            TokenState::Revoked
        } else if now < self.expires_at {
            TokenState::Active
        } else {
            TokenState::Expired
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == TokenState::Active
    }
}

/// Persistence contract the auth orchestrator needs
///
/// Implementations must keep `token_hash` unique.
#[allow(async_fn_in_trait)]
pub trait RefreshTokenStore {
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    /// Look a record up by the plaintext value the client presented
    async fn find_by_value(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Flip `is_revoked`; `false` when no record has this id
    async fn mark_revoked(&self, id: Uuid) -> Result<bool, AppError>;

    /// Atomically revoke `presented` and store `replacement`
    ///
    /// Returns `false`, writing nothing, when `presented` is no longer
    /// active (already rotated by a concurrent request, revoked or expired).
    async fn rotate(
        &self,
        presented: Uuid,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, AppError>;

    /// Delete expired records, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, AppError>;
}
