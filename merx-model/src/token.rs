use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four credential artifacts the issuer can mint.
///
/// Kinds differ only in expiry policy. `Access` is a signed assertion
/// returned to the caller and never persisted; the other three are
/// opaque lookup keys stored on the owning user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
    EmailConfirm,
    PasswordReset,
}

/// A token triple as persisted on a user record.
///
/// Lifecycle: `absent -> issued -> consumed | expired | superseded`.
/// Issuing a new token of a kind overwrites the previous triple of
/// that kind unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// A triple is expired from `expires_at` onward; the boundary
    /// instant itself is rejected.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
