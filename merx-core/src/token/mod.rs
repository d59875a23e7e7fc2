//! Token issuance and validation.

pub mod issued;
pub mod issuer;
pub mod validator;

pub use issued::{IssuedToken, IssuedTokenError};
pub use issuer::{AccessToken, Claims, TokenError, TokenIssuer, TokenPolicy};
pub use validator::TokenValidator;
