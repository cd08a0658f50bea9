/// Session orchestration
///
/// Login, refresh, revoke and credential changes on top of the password
/// hasher, the access token codec and the two stores.
///
/// Refresh tokens are NOT rotated on use: a refresh token stays valid until it
/// expires or is revoked, and concurrent refreshes with the same token all
/// succeed. A stolen refresh token therefore works until one of those happens.
/// Changing credentials does NOT revoke existing refresh tokens either; callers
/// wanting that must call `revoke_all`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::jwt::AccessTokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::{RefreshTokenRecord, RefreshTokenState};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::store::{self, RefreshTokenStore, User, UserStore};

/// Verified against when the email is unknown so both login failures cost one
/// bcrypt verification.
const DUMMY_PASSWORD: &str = "timing-equalization-placeholder";

fn ttl_from_seconds(seconds: i64) -> Result<Duration, AuthError> {
    Duration::try_seconds(seconds)
        .ok_or_else(|| AuthError::HashFailure(format!("token lifetime out of range: {}s", seconds)))
}

/// Result of a successful login
#[derive(Clone)]
pub struct IssuedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    codec: AccessTokenCodec,
    hasher: PasswordHasher,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    store_timeout: StdDuration,
    dummy_hash: Arc<str>,
}

impl SessionManager {
    /// Build a manager from explicit settings and stores.
    ///
    /// Computes one bcrypt hash up front for the unknown-email path.
    pub fn new(
        settings: &AuthSettings,
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(settings.bcrypt_cost);
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            users,
            refresh_tokens,
            codec: AccessTokenCodec::from_settings(settings),
            hasher,
            access_token_ttl: ttl_from_seconds(settings.access_token_ttl_seconds)?,
            refresh_token_ttl: ttl_from_seconds(settings.refresh_token_ttl_seconds)?,
            store_timeout: settings.store_timeout(),
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn codec(&self) -> &AccessTokenCodec {
        &self.codec
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        store::with_timeout(self.store_timeout, call)
            .await
            .map_err(AuthError::from)
    }

    async fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        let hasher = self.hasher;
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::HashFailure(format!("hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, hash: &str, plaintext: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let hash = hash.to_string();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .map_err(|e| AuthError::HashFailure(format!("verification task failed: {}", e)))?
    }

    /// Create an account with a freshly hashed password.
    ///
    /// # Errors
    /// - `HashFailure` if the password cannot be hashed (e.g. over 72 bytes)
    /// - `AccountError::Database(UniqueConstraintViolation)` if the email is taken
    pub async fn register(&self, email: &str, plaintext: &str) -> Result<User, AccountError> {
        let hashed_password = self.hash_password(plaintext).await?;

        let user = store::with_timeout(self.store_timeout, self.users.create(email, &hashed_password))
            .await
            .map_err(AccountError::from_store)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Exchange email and password for an access token and a new refresh token.
    ///
    /// # Errors
    /// `InvalidCredentials` for both an unknown email and a wrong password.
    pub async fn login(&self, email: &str, plaintext: &str) -> Result<IssuedSession, AuthError> {
        let user = self.bounded(self.users.find_by_email(email)).await?;

        let user = match user {
            Some(user) => {
                if !self.verify_password(&user.hashed_password, plaintext).await? {
                    tracing::warn!("Login rejected");
                    return Err(AuthError::InvalidCredentials);
                }
                user
            }
            None => {
                let _ = self.verify_password(&self.dummy_hash, plaintext).await;
                tracing::warn!("Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self.codec.mint(user.id, self.access_token_ttl)?;
        let record = RefreshTokenRecord::issue(user.id, self.refresh_token_ttl)?;
        self.bounded(self.refresh_tokens.insert(&record)).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(IssuedSession {
            user,
            access_token,
            refresh_token: record.token,
        })
    }

    /// Mint a new access token for the owner of a live refresh token.
    ///
    /// The refresh token itself is left untouched.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let record = self
            .bounded(self.refresh_tokens.find(refresh_token))
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh with unknown token");
                AuthError::NotFound
            })?;

        match record.state_at(Utc::now()) {
            RefreshTokenState::Revoked => {
                tracing::warn!(user_id = %record.user_id, "Refresh with revoked token");
                Err(AuthError::Revoked)
            }
            RefreshTokenState::Expired => {
                tracing::info!(user_id = %record.user_id, "Refresh with expired token");
                Err(AuthError::Expired)
            }
            RefreshTokenState::Active => {
                let access_token = self.codec.mint(record.user_id, self.access_token_ttl)?;
                tracing::info!(user_id = %record.user_id, "Access token refreshed");
                Ok(access_token)
            }
        }
    }

    /// Revoke a refresh token.
    ///
    /// Revoking an already revoked token succeeds and keeps the original
    /// revocation time. Expired tokens can still be revoked.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let record = self
            .bounded(self.refresh_tokens.revoke(refresh_token, Utc::now()))
            .await?
            .ok_or(AuthError::NotFound)?;

        tracing::info!(user_id = %record.user_id, "Refresh token revoked");
        Ok(())
    }

    /// Revoke every live refresh token of `user_id` ("log out everywhere").
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self
            .bounded(self.refresh_tokens.revoke_all_for_user(user_id, Utc::now()))
            .await?;

        tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked");
        Ok(revoked)
    }

    /// Replace email and password of `user_id`.
    ///
    /// The caller must already have authenticated as `user_id`. Existing
    /// refresh tokens stay valid.
    ///
    /// # Errors
    /// - `HashFailure`, `StoreFailure`, or `NotFound` if the user vanished
    /// - `AccountError::Database(UniqueConstraintViolation)` if another user
    ///   holds `new_email`
    pub async fn change_credentials(
        &self,
        user_id: Uuid,
        new_email: &str,
        new_plaintext: &str,
    ) -> Result<User, AccountError> {
        let hashed_password = self.hash_password(new_plaintext).await?;

        let user = store::with_timeout(
            self.store_timeout,
            self.users.update_credentials(user_id, new_email, &hashed_password),
        )
        .await
        .map_err(AccountError::from_store)?
        .ok_or(AuthError::NotFound)?;

        tracing::info!(user_id = %user_id, "User credentials changed");
        Ok(user)
    }

    pub async fn user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.bounded(self.users.find_by_id(user_id))
            .await?
            .ok_or(AuthError::NotFound)
    }

    pub async fn set_premium(&self, user_id: Uuid, is_premium: bool) -> Result<User, AuthError> {
        let user = self
            .bounded(self.users.set_premium(user_id, is_premium))
            .await?
            .ok_or(AuthError::NotFound)?;

        tracing::info!(user_id = %user_id, is_premium, "Membership updated");
        Ok(user)
    }
}

/// Failures of operations that write a user's email.
///
/// A duplicate email stays a `DatabaseError` so the boundary answers 409;
/// every other store failure is `AuthError::StoreFailure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    Auth(AuthError),
    Database(DatabaseError),
}

impl AccountError {
    fn from_store(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueConstraintViolation(_) => AccountError::Database(err),
            other => AccountError::Auth(AuthError::from(other)),
        }
    }
}

impl From<AuthError> for AccountError {
    fn from(err: AuthError) -> Self {
        AccountError::Auth(err)
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Auth(e) => AppError::Auth(e),
            AccountError::Database(e) => AppError::Database(e),
        }
    }
}
