//! Domain errors shared by the user directory, job store, application
//! workflow and notification log.

use thiserror::Error;

pub type BoardResult<T> = Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    /// Entity id does not resolve
    #[error("{0}")]
    NotFound(String),

    /// Authenticated, but lacks ownership or role
    #[error("{0}")]
    Forbidden(String),

    /// No principal, or credentials did not check out
    #[error("{0}")]
    Unauthenticated(String),

    /// Duplicate email or duplicate application
    #[error("{0}")]
    Conflict(String),

    /// Operation not allowed in the entity's current state
    #[error("{0}")]
    InvalidState(String),

    /// Missing or malformed input, keyed by field
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl BoardError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for BoardError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return BoardError::conflict("A resource with this identifier already exists");
            }
        }
        BoardError::Database(err)
    }
}
