//! Input checks applied before a store operation is invoked.
//!
//! The repository layer does not repeat these checks.

use crate::error::ErrorKind;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("New passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationFailed
    }
}

fn required(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trimmed project name; empty names are rejected.
pub fn project_name(raw: &str) -> Result<String, ValidationError> {
    required(raw, "Project name")
}

pub fn task_title(raw: &str) -> Result<String, ValidationError> {
    required(raw, "Title")
}

pub fn category_name(raw: &str) -> Result<String, ValidationError> {
    required(raw, "Category name")
}

pub fn display_name(raw: &str) -> Result<String, ValidationError> {
    required(raw, "Name")
}

/// Confirmation must match before length is checked.
pub fn password_change(new_password: &str, confirm: &str) -> Result<(), ValidationError> {
    if new_password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

pub fn signup(
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<(), ValidationError> {
    display_name(name)?;
    required(email, "Email")?;
    password_change(password, confirm)
}
