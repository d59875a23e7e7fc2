use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use merx_model::StoredToken;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum IssuedTokenError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("token generation failed")]
    GenerationFailed,
}

/// Transient issued-token value object.
///
/// Created by the issuer, embedded into the owning credential record,
/// read back during validation, discarded once expired or consumed.
/// The value is 256 bits of OS entropy, URL-safe base64 encoded, and
/// is zeroed from memory on drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    value: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn generate(lifetime: Duration) -> Result<Self, IssuedTokenError> {
        use rand::{TryRngCore, rngs::OsRng};

        let mut token_bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut token_bytes)
            .map_err(|_| IssuedTokenError::GenerationFailed)?;

        let value = URL_SAFE_NO_PAD.encode(token_bytes);
        let created_at = Utc::now();
        let expires_at = created_at + lifetime;

        Ok(Self {
            value,
            created_at,
            expires_at,
        })
    }

    /// Rehydrate a token from stored parts (for validation paths).
    pub fn from_value(
        value: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, IssuedTokenError> {
        if value.is_empty() || expires_at <= created_at {
            return Err(IssuedTokenError::InvalidFormat);
        }

        if URL_SAFE_NO_PAD.decode(&value).is_err() {
            return Err(IssuedTokenError::InvalidFormat);
        }

        Ok(Self {
            value,
            created_at,
            expires_at,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Expired from the boundary instant onward: `now >= expires_at`.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn secure_compare(&self, other: &str) -> bool {
        let self_bytes = self.value.as_bytes();
        let other_bytes = other.as_bytes();

        if self_bytes.len() != other_bytes.len() {
            return false;
        }

        constant_time_eq(self_bytes, other_bytes)
    }

    /// The persistable triple for embedding into a credential record.
    pub fn to_stored(&self) -> StoredToken {
        StoredToken {
            value: self.value.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl Drop for IssuedToken {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_opaque_values() {
        let a = IssuedToken::generate(Duration::hours(1)).unwrap();
        let b = IssuedToken::generate(Duration::hours(1)).unwrap();
        assert_ne!(a.as_str(), b.as_str());
        assert!(a.expires_at() > a.created_at());
        assert!(!a.is_expired());
    }

    #[test]
    fn boundary_instant_counts_as_expired() {
        let created_at = Utc::now() - Duration::hours(1);
        let value = URL_SAFE_NO_PAD.encode([7u8; 32]);

        let expired_now =
            IssuedToken::from_value(value.clone(), created_at, Utc::now())
                .unwrap();
        assert!(expired_now.is_expired());

        let still_live = IssuedToken::from_value(
            value,
            created_at,
            Utc::now() + Duration::seconds(2),
        )
        .unwrap();
        assert!(!still_live.is_expired());
    }

    #[test]
    fn rejects_malformed_stored_values() {
        let now = Utc::now();
        assert!(
            IssuedToken::from_value(String::new(), now, now + Duration::hours(1))
                .is_err()
        );
        assert!(
            IssuedToken::from_value("not base64!!".into(), now, now + Duration::hours(1))
                .is_err()
        );
        assert!(
            IssuedToken::from_value("dG9rZW4".into(), now, now - Duration::hours(1))
                .is_err()
        );
    }

    #[test]
    fn secure_compare_requires_exact_match() {
        let token = IssuedToken::generate(Duration::hours(1)).unwrap();
        assert!(token.secure_compare(token.as_str()));
        assert!(!token.secure_compare("something-else"));
    }
}
