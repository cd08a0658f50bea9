/// Persistence contracts
///
/// The credential core only talks to these traits. `postgres` backs them with
/// sqlx, `memory` with process-local maps for tests and local runs.

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::RefreshTokenRecord;
use crate::error::DatabaseError;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use postgres::{PgRefreshTokenStore, PgUserStore};

/// A registered account
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("hashed_password", &"<redacted>")
            .field("is_premium", &self.is_premium)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UniqueConstraintViolation` if the email is taken.
    async fn create(&self, email: &str, hashed_password: &str) -> Result<User, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// `None` if no user has this id.
    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, DatabaseError>;

    /// `None` if no user has this id.
    async fn set_premium(&self, id: Uuid, is_premium: bool) -> Result<Option<User>, DatabaseError>;
}

/// Durable table of issued refresh tokens, addressed by the presented token value.
///
/// Implementations must be read-after-write consistent across callers and
/// must not cache liveness: a revoke is visible to the very next `find`.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Set `revoked_at = at` unless already set, atomically, and return the
    /// record as stored afterwards. `None` if the token is unknown.
    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Revoke every unrevoked record of `user_id`; returns how many changed.
    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError>;
}

/// Bound a store call; elapsed time becomes `DatabaseError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DatabaseError::Timeout(limit.as_millis() as u64)),
    }
}
