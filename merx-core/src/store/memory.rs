use std::collections::HashMap;

use async_trait::async_trait;
use merx_model::{TokenKind, UserRecord};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::CredentialStore;
use crate::error::StoreError;

/// In-memory credential store.
///
/// Backs the integration tests and storeless development runs. Every
/// write takes the single lock, which gives the per-record atomicity
/// the port requires.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find_where<F>(&self, pred: F) -> Option<UserRecord>
    where
        F: Fn(&UserRecord) -> bool,
    {
        let users = self.users.read().await;
        users.values().find(|u| pred(u)).cloned()
    }

    async fn find_by_token(&self, kind: TokenKind, value: &str) -> Option<UserRecord> {
        if value.is_empty() {
            return None;
        }
        self.find_where(|u| {
            u.token(kind).is_some_and(|stored| stored.value == value)
        })
        .await
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.find_where(|u| u.username == username).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.find_where(|u| u.email == email).await)
    }

    async fn find_by_refresh_token(&self, value: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.find_by_token(TokenKind::Refresh, value).await)
    }

    async fn find_by_email_confirm_token(
        &self,
        value: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.find_by_token(TokenKind::EmailConfirm, value).await)
    }

    async fn find_by_reset_token(&self, value: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.find_by_token(TokenKind::PasswordReset, value).await)
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(user.username.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(StoreError::Unavailable(format!(
                "unknown user id: {}",
                user.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use merx_model::{Role, StoredToken};

    fn user(username: &str, email: &str) -> UserRecord {
        UserRecord::new(
            username.into(),
            email.into(),
            Role::Customer,
            vec![1; 32],
            vec![2; 64],
        )
    }

    #[tokio::test]
    async fn inserts_and_looks_up_by_each_index() {
        let store = MemoryCredentialStore::new();
        let mut alice = user("alice", "alice@shop.test");
        let now = Utc::now();
        alice.set_token(
            TokenKind::Refresh,
            Some(StoredToken {
                value: "refresh-1".into(),
                created_at: now,
                expires_at: now + Duration::days(7),
            }),
        );
        store.insert(&alice).await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_some());
        assert!(store.find_by_email("alice@shop.test").await.unwrap().is_some());
        assert!(store.find_by_refresh_token("refresh-1").await.unwrap().is_some());
        assert!(store.find_by_refresh_token("refresh-2").await.unwrap().is_none());
        assert!(store.find_by_reset_token("refresh-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_replaces_the_whole_record() {
        let store = MemoryCredentialStore::new();
        let mut alice = user("alice", "alice@shop.test");
        store.insert(&alice).await.unwrap();

        alice.confirm_email();
        store.update(&alice).await.unwrap();

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(stored.email_confirmed);
    }

    #[tokio::test]
    async fn rejects_duplicate_usernames_and_unknown_updates() {
        let store = MemoryCredentialStore::new();
        store.insert(&user("alice", "a@shop.test")).await.unwrap();

        let err = store
            .insert(&user("alice", "b@shop.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        assert!(store.update(&user("bob", "bob@shop.test")).await.is_err());
    }

    #[tokio::test]
    async fn empty_token_values_never_match() {
        let store = MemoryCredentialStore::new();
        let alice = user("alice", "alice@shop.test");
        store.insert(&alice).await.unwrap();
        assert!(store.find_by_refresh_token("").await.unwrap().is_none());
    }
}
