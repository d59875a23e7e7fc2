//! # Merx Core
//!
//! Credential and token lifecycle core for the Merx identity service.
//!
//! The crate owns the parts of the backend with real invariants:
//!
//! - **Password hashing** ([`crypto`]): keyed digests over plaintext
//!   passwords, one fresh random salt per password set.
//! - **Token issuance** ([`token`]): signed access tokens plus three
//!   opaque, time-boxed, single-use token kinds (refresh,
//!   email-confirmation, password-reset), each with its own expiry
//!   policy.
//! - **Token validation** ([`token::TokenValidator`]): read-only
//!   lookup-and-expiry checks; mutation stays with the workflows.
//! - **Workflows** ([`service::AuthService`]): login, refresh
//!   rotation, registration, email confirmation, forgot/reset/change
//!   password.
//!
//! Persistence and email delivery are collaborators behind the
//! [`store::CredentialStore`] and [`mailer::Mailer`] ports.

pub mod crypto;
pub mod error;
pub mod mailer;
pub mod service;
pub mod store;
pub mod token;

pub use error::{AuthError, StoreError};
pub use mailer::{Mailer, MailerError, NoopMailer, SmtpMailer, SmtpSettings};
pub use service::{AuthService, Registration, TokenBundle};
pub use store::{CredentialStore, MemoryCredentialStore};
#[cfg(feature = "database")]
pub use store::PgCredentialStore;
pub use token::{
    AccessToken, Claims, IssuedToken, TokenError, TokenIssuer, TokenPolicy,
    TokenValidator,
};
