use std::sync::Arc;

use merx_model::{Role, TokenKind, UserRecord};

use crate::crypto;
use crate::error::{AuthError, StoreError};
use crate::mailer::Mailer;
use crate::store::CredentialStore;
use crate::token::{AccessToken, Claims, IssuedToken, TokenError, TokenIssuer, TokenValidator};

/// Credentials minted by a successful login or refresh.
///
/// The access token goes back to the caller in the response body; the
/// refresh token is persisted on the user record and carried in an
/// HttpOnly cookie by the transport layer.
#[derive(Debug)]
pub struct TokenBundle {
    pub user_id: uuid::Uuid,
    pub access_token: AccessToken,
    pub refresh_token: IssuedToken,
}

/// Outcome of a successful registration.
#[derive(Debug)]
pub struct Registration {
    pub user_id: uuid::Uuid,
    pub confirmation_link: String,
}

/// Auth workflow orchestrator.
///
/// Each method is a short-lived, independent unit of work: fetch the
/// current record, check a precondition, mint a token when it holds,
/// mutate the record, persist. No cross-request state lives here; the
/// credential store owns the durable record and serializes per-record
/// updates.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn Mailer>,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("store_refs", &Arc::strong_count(&self.store))
            .field("mailer_refs", &Arc::strong_count(&self.mailer))
            .field("issuer", &self.issuer)
            .finish()
    }
}

fn internal(err: TokenError) -> AuthError {
    AuthError::Internal(anyhow::Error::new(err))
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn Mailer>,
        issuer: TokenIssuer,
    ) -> Self {
        let validator = TokenValidator::new(store.clone());
        Self {
            store,
            mailer,
            issuer,
            validator,
        }
    }

    /// Authenticate with username and password, minting a fresh
    /// access/refresh pair.
    ///
    /// An unknown username and a digest mismatch are indistinguishable
    /// to the caller.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenBundle, AuthError> {
        let mut user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = crypto::verify(password, &user.password_salt, &user.password_digest)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.email_confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        let access_token = self.issuer.access_token(&user).map_err(internal)?;
        let refresh_token = self
            .issuer
            .issue(TokenKind::Refresh)
            .map_err(internal)?;

        user.set_token(TokenKind::Refresh, Some(refresh_token.to_stored()));
        self.store.update(&user).await?;

        tracing::debug!(user_id = %user.id, "login succeeded");

        Ok(TokenBundle {
            user_id: user.id,
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access/refresh pair.
    ///
    /// The presented value must match the currently stored triple; a
    /// value superseded by an earlier rotation matches nothing.
    /// Expired refresh tokens are rejected rather than silently
    /// rotated.
    pub async fn refresh_access_token(
        &self,
        presented: &str,
    ) -> Result<TokenBundle, AuthError> {
        let mut user = self
            .validator
            .validate(TokenKind::Refresh, presented)
            .await?;

        let access_token = self.issuer.access_token(&user).map_err(internal)?;
        let refresh_token = self
            .issuer
            .issue(TokenKind::Refresh)
            .map_err(internal)?;

        // Rotation: the old value is invalid from here on.
        user.set_token(TokenKind::Refresh, Some(refresh_token.to_stored()));
        self.store.update(&user).await?;

        tracing::debug!(user_id = %user.id, "refresh token rotated");

        Ok(TokenBundle {
            user_id: user.id,
            access_token,
            refresh_token,
        })
    }

    /// Create a new unconfirmed user and hand back the confirmation
    /// link. Sending the link is the email collaborator's job, driven
    /// by the caller.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Registration, AuthError> {
        if self.store.find_by_username(username).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let salt = crypto::new_salt()
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        let digest = crypto::digest(password, &salt)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;

        let confirm_token = self
            .issuer
            .issue(TokenKind::EmailConfirm)
            .map_err(internal)?;

        let mut user = UserRecord::new(
            username.to_string(),
            email.to_string(),
            role,
            digest,
            salt,
        );
        user.set_token(TokenKind::EmailConfirm, Some(confirm_token.to_stored()));
        // A registration racing past the pre-check loses at the store.
        self.store.insert(&user).await.map_err(|err| match err {
            StoreError::Duplicate(_) => AuthError::UserExists,
            other => AuthError::Store(other),
        })?;

        tracing::info!(user_id = %user.id, username, "registered new user");

        Ok(Registration {
            user_id: user.id,
            confirmation_link: self.issuer.confirmation_link(&confirm_token),
        })
    }

    /// Flip the monotonic confirmed flag for the token's owner.
    pub async fn confirm_email(&self, token: &str) -> Result<(), AuthError> {
        let mut user = self
            .validator
            .validate(TokenKind::EmailConfirm, token)
            .await?;

        if user.email_confirmed {
            return Err(AuthError::AlreadyConfirmed);
        }

        user.confirm_email();
        self.store.update(&user).await?;

        tracing::info!(user_id = %user.id, "email confirmed");
        Ok(())
    }

    /// Issue a password-reset token for the account behind `email` and
    /// mail the reset link.
    ///
    /// The link is also returned to the caller, a deliberate
    /// convenience for environments without a live mail transport.
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let reset_token = self
            .issuer
            .issue(TokenKind::PasswordReset)
            .map_err(internal)?;
        user.set_token(TokenKind::PasswordReset, Some(reset_token.to_stored()));
        self.store.update(&user).await?;

        let reset_link = self.issuer.reset_link(&reset_token);
        let body = format!(
            "Please use the following link to reset your password: \
             <a href='{reset_link}'>Reset Password</a>"
        );

        // Delivery failure must not abort the workflow.
        if let Err(err) = self
            .mailer
            .send(&user.email, "Password Reset Request", &body)
            .await
        {
            tracing::warn!(user_id = %user.id, error = %err, "reset email delivery failed");
        }

        tracing::debug!(user_id = %user.id, "password reset token issued");
        Ok(reset_link)
    }

    /// Set a new password for the reset token's owner and consume the
    /// token. Salt and digest are replaced together.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut user = self
            .validator
            .validate(TokenKind::PasswordReset, token)
            .await?;

        let salt = crypto::new_salt()
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        let digest = crypto::digest(new_password, &salt)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;

        user.set_password(digest, salt);
        // Consume the token in the same persisted write.
        user.set_token(TokenKind::PasswordReset, None);
        self.store.update(&user).await?;

        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    /// Verify the old password against the stored salt and digest,
    /// then set the new password under a fresh salt.
    pub async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let verified =
            crypto::verify(old_password, &user.password_salt, &user.password_digest)
                .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        if !verified {
            return Err(AuthError::WrongPassword);
        }

        let salt = crypto::new_salt()
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        let digest = crypto::digest(new_password, &salt)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;

        user.set_password(digest, salt);
        self.store.update(&user).await?;

        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Verify an access token without consulting the store.
    ///
    /// Used by the transport layer's bearer check.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.issuer.decode_access(token).map_err(|err| match err {
            TokenError::Jwt(jwt_err)
                if matches!(
                    jwt_err.kind(),
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature
                ) =>
            {
                AuthError::TokenExpired
            }
            _ => AuthError::InvalidToken,
        })
    }
}
