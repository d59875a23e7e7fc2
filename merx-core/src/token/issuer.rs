use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use merx_model::{Role, TokenKind, UserRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::issued::{IssuedToken, IssuedTokenError};

/// Expiry policy and link construction inputs for the issuer.
///
/// The public base URL is injected here so confirmation and reset
/// links never hardcode a host.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub base_url: String,
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
    pub email_confirm_lifetime: Duration,
    pub password_reset_lifetime: Duration,
}

impl TokenPolicy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_lifetime: Duration::minutes(15),
            refresh_lifetime: Duration::days(7),
            email_confirm_lifetime: Duration::hours(24),
            password_reset_lifetime: Duration::hours(1),
        }
    }

    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Refresh => self.refresh_lifetime,
            TokenKind::EmailConfirm => self.email_confirm_lifetime,
            TokenKind::PasswordReset => self.password_reset_lifetime,
        }
    }
}

/// JWT claims for access tokens.
///
/// Carries identity, username, and role so a downstream authorization
/// check can verify the assertion without consulting the credential
/// store on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// A signed access token together with its expiry instant.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token generation failed")]
    Generation,
    #[error("access token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl From<IssuedTokenError> for TokenError {
    fn from(_: IssuedTokenError) -> Self {
        TokenError::Generation
    }
}

/// Mints the four credential artifacts.
///
/// Opaque kinds get 256 random bits stamped with the kind's lifetime;
/// the access kind is an HS256 JWT over [`Claims`]. Issuance is pure
/// with respect to current time: `created_at = now`,
/// `expires_at = now + lifetime(kind)`.
pub struct TokenIssuer {
    policy: TokenPolicy,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(policy: TokenPolicy, jwt_secret: &[u8]) -> Self {
        Self {
            policy,
            encoding: EncodingKey::from_secret(jwt_secret),
            decoding: DecodingKey::from_secret(jwt_secret),
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Issue an opaque token of the given kind.
    pub fn issue(&self, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        Ok(IssuedToken::generate(self.policy.lifetime(kind))?)
    }

    /// Issue a signed access token asserting the user's identity.
    pub fn access_token(&self, user: &UserRecord) -> Result<AccessToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.policy.lifetime(TokenKind::Access);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(AccessToken { token, expires_at })
    }

    /// Decode and verify an access token's claims.
    ///
    /// Zero leeway: `exp` is enforced at the boundary instant, like
    /// every other token kind.
    pub fn decode_access(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    pub fn confirmation_link(&self, token: &IssuedToken) -> String {
        format!(
            "{}/api/auth/confirm-email?token={}",
            self.policy.base_url.trim_end_matches('/'),
            token.as_str()
        )
    }

    pub fn reset_link(&self, token: &IssuedToken) -> String {
        format!(
            "{}/api/auth/reset-password?token={}",
            self.policy.base_url.trim_end_matches('/'),
            token.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenPolicy::new("https://shop.test/"), b"test-secret")
    }

    fn user() -> UserRecord {
        UserRecord::new(
            "alice".into(),
            "alice@shop.test".into(),
            Role::Admin,
            vec![1; 32],
            vec![2; 64],
        )
    }

    #[test]
    fn access_tokens_round_trip_their_claims() {
        let issuer = issuer();
        let user = user();

        let access = issuer.access_token(&user).unwrap();
        let claims = issuer.decode_access(&access.token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn access_tokens_expire_without_leeway() {
        let issuer = issuer();
        let now = Utc::now();

        // Recently expired, well within the 60s default leeway this
        // decoder must not grant.
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "alice".into(),
            role: Role::Customer,
            iat: (now - Duration::minutes(16)).timestamp(),
            exp: (now - Duration::seconds(5)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = issuer.decode_access(&token).unwrap_err();
        assert!(matches!(
            err,
            TokenError::Jwt(ref jwt_err) if matches!(
                jwt_err.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            )
        ));
    }

    #[test]
    fn access_tokens_reject_a_foreign_secret() {
        let user = user();
        let access = issuer().access_token(&user).unwrap();

        let other =
            TokenIssuer::new(TokenPolicy::new("https://shop.test"), b"other-secret");
        assert!(other.decode_access(&access.token).is_err());
    }

    #[test]
    fn opaque_kinds_get_their_configured_lifetimes() {
        let issuer = issuer();
        for (kind, lifetime) in [
            (TokenKind::Refresh, Duration::days(7)),
            (TokenKind::EmailConfirm, Duration::hours(24)),
            (TokenKind::PasswordReset, Duration::hours(1)),
        ] {
            let token = issuer.issue(kind).unwrap();
            assert_eq!(token.expires_at() - token.created_at(), lifetime);
        }
    }

    #[test]
    fn links_use_the_configured_base_url() {
        let issuer = issuer();
        let token = issuer.issue(TokenKind::EmailConfirm).unwrap();

        let link = issuer.confirmation_link(&token);
        assert!(link.starts_with("https://shop.test/api/auth/confirm-email?token="));
        assert!(link.ends_with(token.as_str()));

        let reset = issuer.issue(TokenKind::PasswordReset).unwrap();
        assert!(
            issuer
                .reset_link(&reset)
                .starts_with("https://shop.test/api/auth/reset-password?token=")
        );
    }
}
