/// Access token claims
///
/// The whole state of an access token lives here; nothing is stored
/// server-side (RFC 7519 registered claims only).

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer (fixed service name)
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id`, issued now and expiring after `ttl`.
    ///
    /// A negative `ttl` yields claims that are already expired.
    pub fn new(user_id: Uuid, issuer: &str, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: issuer.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// `MalformedCredential` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedCredential)
    }

    /// `exp <= now - leeway`
    pub fn is_expired_at(&self, now: i64, leeway_seconds: u64) -> bool {
        let leeway = i64::try_from(leeway_seconds).unwrap_or(i64::MAX);
        self.exp <= now.saturating_sub(leeway)
    }
}
