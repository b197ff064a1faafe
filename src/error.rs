//! Unified application error model.
//! Every fallible operation in the crate returns `AppResult`; the CLI maps the
//! variants onto process exit codes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Forbidden { code: String, message: String },
    Corrupt { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Corrupt { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Corrupt { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn corrupt<S: Into<String>>(code: S, msg: S) -> Self { AppError::Corrupt { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// True for bad-input failures that left all state untouched.
    pub fn is_validation(&self) -> bool { matches!(self, AppError::UserInput { .. }) }

    /// Map to a process exit code for the CLI front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::UserInput { .. } | AppError::Conflict { .. } => 2,
            AppError::NotFound { .. } => 3,
            AppError::Auth { .. } | AppError::Forbidden { .. } => 4,
            AppError::Corrupt { .. } | AppError::Io { .. } | AppError::Internal { .. } => 1,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

/// Bad-input failures raised by the credential store and the portal collections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email already exists")]
    EmailExists,
    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("New passwords do not match")]
    PasswordMismatch,
    #[error("Current password is incorrect")]
    IncorrectPassword,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("role '{0}' cannot be chosen at registration")]
    RoleNotAllowed(String),
    #[error("Cannot delete your own account")]
    CannotDeleteSelf,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmailExists => "email_exists",
            ValidationError::PasswordTooShort { .. } => "password_too_short",
            ValidationError::PasswordMismatch => "password_mismatch",
            ValidationError::IncorrectPassword => "incorrect_password",
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::RoleNotAllowed(_) => "role_not_allowed",
            ValidationError::CannotDeleteSelf => "cannot_delete_self",
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::UserInput { code: err.code().into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Corrupt { code: "malformed_json".into(), message: err.to_string() }
    }
}

impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Corrupt { code: "malformed_snapshot".into(), message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "io_error".into(), message: err.to_string() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless downcasted elsewhere
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
