use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;
use crate::token::{StoredToken, TokenKind};

/// Durable user credential record, the identity anchor.
///
/// The credential store exclusively owns the durable copy; workflow
/// code only ever holds a transient snapshot for the duration of one
/// request.
///
/// Invariants maintained by the workflows that mutate this record:
/// - `password_digest` is always the keyed hash of some plaintext
///   under `password_salt`; the two fields change together or not at
///   all.
/// - At most one live token of each kind exists; issuing a new token
///   of a kind overwrites the previous triple unconditionally.
/// - `email_confirmed` is monotonic: once true it never goes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password_digest: Vec<u8>,
    pub password_salt: Vec<u8>,
    pub email_confirmed: bool,
    pub refresh_token: Option<StoredToken>,
    pub email_confirm_token: Option<StoredToken>,
    pub password_reset_token: Option<StoredToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        username: String,
        email: String,
        role: Role,
        password_digest: Vec<u8>,
        password_salt: Vec<u8>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            role,
            password_digest,
            password_salt,
            email_confirmed: false,
            refresh_token: None,
            email_confirm_token: None,
            password_reset_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The stored triple for an opaque token kind. `Access` tokens are
    /// never persisted, so the access arm is always empty.
    pub fn token(&self, kind: TokenKind) -> Option<&StoredToken> {
        match kind {
            TokenKind::Access => None,
            TokenKind::Refresh => self.refresh_token.as_ref(),
            TokenKind::EmailConfirm => self.email_confirm_token.as_ref(),
            TokenKind::PasswordReset => self.password_reset_token.as_ref(),
        }
    }

    /// Overwrite (or clear) the stored triple for an opaque token kind.
    pub fn set_token(&mut self, kind: TokenKind, token: Option<StoredToken>) {
        match kind {
            TokenKind::Access => {}
            TokenKind::Refresh => self.refresh_token = token,
            TokenKind::EmailConfirm => self.email_confirm_token = token,
            TokenKind::PasswordReset => self.password_reset_token = token,
        }
        self.updated_at = Utc::now();
    }

    /// Replace the password digest and salt as a single unit.
    pub fn set_password(&mut self, digest: Vec<u8>, salt: Vec<u8>) {
        self.password_digest = digest;
        self.password_salt = salt;
        self.updated_at = Utc::now();
    }

    pub fn confirm_email(&mut self) {
        self.email_confirmed = true;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> UserRecord {
        UserRecord::new(
            "alice".into(),
            "alice@example.com".into(),
            Role::Customer,
            vec![1; 32],
            vec![2; 64],
        )
    }

    #[test]
    fn new_users_start_unconfirmed_and_tokenless() {
        let user = sample_user();
        assert!(!user.email_confirmed);
        for kind in [
            TokenKind::Refresh,
            TokenKind::EmailConfirm,
            TokenKind::PasswordReset,
        ] {
            assert!(user.token(kind).is_none());
        }
    }

    #[test]
    fn setting_a_token_overwrites_the_previous_triple() {
        let mut user = sample_user();
        let now = Utc::now();
        let first = StoredToken {
            value: "first".into(),
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        let second = StoredToken {
            value: "second".into(),
            created_at: now,
            expires_at: now + Duration::hours(2),
        };

        user.set_token(TokenKind::Refresh, Some(first));
        user.set_token(TokenKind::Refresh, Some(second.clone()));
        assert_eq!(user.token(TokenKind::Refresh), Some(&second));

        user.set_token(TokenKind::Refresh, None);
        assert!(user.token(TokenKind::Refresh).is_none());
    }

    #[test]
    fn access_tokens_are_never_stored() {
        let mut user = sample_user();
        let now = Utc::now();
        user.set_token(
            TokenKind::Access,
            Some(StoredToken {
                value: "jwt".into(),
                created_at: now,
                expires_at: now + Duration::minutes(15),
            }),
        );
        assert!(user.token(TokenKind::Access).is_none());
    }
}
