use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// Validation errors for user input
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error(
        "Invalid username: must be 3-30 characters, alphanumeric or underscore"
    )]
    InvalidUsername,

    #[error("Password too short: minimum 8 characters required")]
    PasswordTooShort,

    #[error("Invalid email address")]
    InvalidEmail,
}

fn check_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < 3 || username.len() > 30 {
        return Err(ValidationError::InvalidUsername);
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    // Deliverability is the mail relay's problem; this only rejects
    // obviously malformed input.
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_email(&self.email)?;
        check_password(&self.password)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_password(&self.password)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub username: String,
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_password(&self.new_password)
    }
}
