use thiserror::Error;

/// Failure taxonomy surfaced by the auth workflows.
///
/// Every variant maps one-to-one onto a caller-visible rejection; none
/// are retried internally. [`AuthError::Store`] is the only kind a
/// caller might sensibly retry, and it is fatal to the current call.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("User already exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Email already confirmed")]
    AlreadyConfirmed,

    #[error("Old password is incorrect")]
    WrongPassword,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Credential-store failure, propagated unchanged through the flows.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    /// Insert collided with an existing record. Lets a registration
    /// that races past the username pre-check still surface as
    /// [`AuthError::UserExists`] instead of a store outage.
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}
