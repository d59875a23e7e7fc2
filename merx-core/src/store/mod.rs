//! Credential store port and adapters.
//!
//! The store exclusively owns the durable user record. It must apply
//! updates atomically per record so two concurrent workflows for the
//! same user cannot interleave partial writes.

use async_trait::async_trait;
use merx_model::UserRecord;
use uuid::Uuid;

use crate::error::StoreError;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryCredentialStore;
#[cfg(feature = "database")]
pub use postgres::PgCredentialStore;

/// Lookup and persistence surface the auth workflows depend on.
///
/// Token lookups match on the stored value of that kind only; a value
/// that was superseded or cleared matches nothing.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn find_by_refresh_token(&self, value: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn find_by_email_confirm_token(
        &self,
        value: &str,
    ) -> Result<Option<UserRecord>, StoreError>;
    async fn find_by_reset_token(&self, value: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Persist a brand-new record.
    async fn insert(&self, user: &UserRecord) -> Result<(), StoreError>;

    /// Replace the stored record for `user.id` in one atomic write.
    async fn update(&self, user: &UserRecord) -> Result<(), StoreError>;
}
