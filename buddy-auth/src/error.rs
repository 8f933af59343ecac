//! Error types for the `buddy-auth` crate.

use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The database rejected or failed a query.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another account already uses this username.
    #[error("Username already exists")]
    UsernameTaken,

    /// Another account already uses this email.
    #[error("Email already exists")]
    EmailTaken,

    /// Unknown identifier or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No user with the given id.
    #[error("User not found: {0}")]
    NotFound(String),

    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),
}

/// A convenience result type for account operations.
pub type Result<T> = std::result::Result<T, AuthError>;
