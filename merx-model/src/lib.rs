//! Core data model definitions shared across Merx crates.
#![allow(missing_docs)]

pub mod requests;
pub mod role;
pub mod token;
pub mod user;

// Intentionally curated re-exports for downstream consumers.
pub use requests::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
    RegisterRequest, ResetPasswordRequest, ValidationError,
};
pub use role::Role;
pub use token::{StoredToken, TokenKind};
pub use user::UserRecord;
