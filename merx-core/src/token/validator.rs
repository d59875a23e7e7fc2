use std::sync::Arc;

use chrono::Utc;
use merx_model::{TokenKind, UserRecord};

use crate::error::AuthError;
use crate::store::CredentialStore;

/// Read-only check of a presented opaque token.
///
/// "Never existed" and "belongs to someone else" both collapse to
/// `InvalidToken` so callers cannot enumerate token ownership.
/// Validation never mutates state; clearing or rotating a matched
/// token is the caller's responsibility.
#[derive(Clone)]
pub struct TokenValidator {
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("store_refs", &Arc::strong_count(&self.store))
            .finish()
    }
}

impl TokenValidator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Look up the user owning the presented token of `kind` and check
    /// its expiry. `now >= expires_at` rejects with `TokenExpired`.
    pub async fn validate(
        &self,
        kind: TokenKind,
        presented: &str,
    ) -> Result<UserRecord, AuthError> {
        if presented.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let user = match kind {
            // Access tokens are signed assertions, not lookup keys.
            TokenKind::Access => return Err(AuthError::InvalidToken),
            TokenKind::Refresh => self.store.find_by_refresh_token(presented).await?,
            TokenKind::EmailConfirm => {
                self.store.find_by_email_confirm_token(presented).await?
            }
            TokenKind::PasswordReset => self.store.find_by_reset_token(presented).await?,
        }
        .ok_or(AuthError::InvalidToken)?;

        let stored = user.token(kind).ok_or(AuthError::InvalidToken)?;
        if stored.is_expired_at(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use merx_model::{Role, StoredToken};

    use crate::store::MemoryCredentialStore;

    async fn store_with_token(
        kind: TokenKind,
        expires_in: Duration,
    ) -> (Arc<MemoryCredentialStore>, String) {
        let store = Arc::new(MemoryCredentialStore::new());
        let mut user = UserRecord::new(
            "alice".into(),
            "alice@shop.test".into(),
            Role::Customer,
            vec![1; 32],
            vec![2; 64],
        );
        let now = Utc::now();
        let value = format!("token-{kind:?}");
        user.set_token(
            kind,
            Some(StoredToken {
                value: value.clone(),
                created_at: now,
                expires_at: now + expires_in,
            }),
        );
        store.insert(&user).await.unwrap();
        (store, value)
    }

    #[tokio::test]
    async fn live_tokens_resolve_to_their_owner() {
        let (store, value) =
            store_with_token(TokenKind::EmailConfirm, Duration::hours(1)).await;
        let validator = TokenValidator::new(store);

        let user = validator
            .validate(TokenKind::EmailConfirm, &value)
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn unknown_values_are_invalid_not_distinguishable() {
        let (store, _) =
            store_with_token(TokenKind::PasswordReset, Duration::hours(1)).await;
        let validator = TokenValidator::new(store);

        let err = validator
            .validate(TokenKind::PasswordReset, "never-issued")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        let err = validator
            .validate(TokenKind::PasswordReset, "")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn stale_tokens_report_expired() {
        let (store, value) =
            store_with_token(TokenKind::PasswordReset, Duration::zero()).await;
        let validator = TokenValidator::new(store);

        let err = validator
            .validate(TokenKind::PasswordReset, &value)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn kinds_do_not_cross_match() {
        let (store, value) =
            store_with_token(TokenKind::Refresh, Duration::days(1)).await;
        let validator = TokenValidator::new(store);

        let err = validator
            .validate(TokenKind::PasswordReset, &value)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
