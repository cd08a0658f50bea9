use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::RefreshTokenRecord;
use crate::error::DatabaseError;
use crate::store::{RefreshTokenStore, User, UserStore};

/// Process-local `UserStore` with the same uniqueness rule on email as the
/// `users` table.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, email: &str, hashed_password: &str) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if email_taken(&users, email, None) {
            return Err(DatabaseError::UniqueConstraintViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_premium: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let mut users = self.users.write().await;
        if email_taken(&users, email, Some(id)) {
            return Err(DatabaseError::UniqueConstraintViolation("users_email_key".to_string()));
        }

        Ok(users.get_mut(&id).map(|user| {
            user.email = email.to_string();
            user.hashed_password = hashed_password.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_premium(&self, id: Uuid, is_premium: bool) -> Result<Option<User>, DatabaseError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.is_premium = is_premium;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

/// Process-local `RefreshTokenStore`. Every call goes through one lock, so a
/// revoke is visible to the next lookup from any task.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records owned by `user_id`, oldest first.
    pub async fn records_for_user(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        let records = self.records.read().await;
        let mut owned: Vec<RefreshTokenRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|r| r.created_at);
        owned
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens_pkey".to_string(),
            ));
        }
        records.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        Ok(self.records.read().await.get(token).cloned())
    }

    async fn revoke(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(token).map(|record| {
            record.revoked_at.get_or_insert(at);
            record.clone()
        }))
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut records = self.records.write().await;
        let mut revoked = 0;
        for record in records
            .values_mut()
            .filter(|r| r.user_id == user_id && r.revoked_at.is_none())
        {
            record.revoked_at = Some(at);
            revoked += 1;
        }
        Ok(revoked)
    }
}
