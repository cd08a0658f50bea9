/// Refresh Tokens
///
/// Refresh tokens are opaque capability keys: 64 characters drawn uniformly
/// from `[A-Za-z0-9]` by the thread-local CSPRNG (about 381 bits of entropy).
/// They carry no claims; everything about a token lives in its
/// `RefreshTokenRecord`.
///
/// Lifecycle: `Active` until either revoked (terminal, explicit) or past
/// `expires_at` (terminal, derived from the clock). Using a token to refresh
/// does not rotate or mutate it.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AuthError;

pub const REFRESH_TOKEN_LENGTH: usize = 64;

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of a refresh token, the form persisted at rest.
pub fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Revoked,
    Expired,
}

/// A server-tracked refresh token.
///
/// `token` is the value presented by the client. `revoked_at` only ever goes
/// from `None` to `Some`.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Fresh record with a newly generated token for `user_id`.
    ///
    /// # Errors
    /// `HashFailure` if `now + ttl` is outside the representable date range
    pub fn issue(user_id: Uuid, ttl: Duration) -> Result<Self, AuthError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            AuthError::HashFailure(format!(
                "refresh token expiry out of range (ttl {}s)",
                ttl.num_seconds()
            ))
        })?;

        Ok(Self {
            token: generate_refresh_token(),
            user_id,
            created_at: now,
            expires_at,
            revoked_at: None,
        })
    }

    /// Revocation wins over expiry when both apply.
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if self.expires_at <= now {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }
}

impl std::fmt::Debug for RefreshTokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenRecord")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("revoked_at", &self.revoked_at)
            .finish()
    }
}
