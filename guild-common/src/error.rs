//! Common error types for the guild roster services

use thiserror::Error;

/// Common result type for guild operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the guild services
#[derive(Error, Debug)]
pub enum Error {
    /// Persistence layer failure (wraps sqlx::Error)
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed signup or roster input, rejected before persistence
    #[error("Validation error: {0}")]
    Validation(String),

    /// Selection/priority transition attempted from an illegal state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Random draw over a role bucket with no participants
    #[error("Empty set: {0}")]
    EmptySet(String),

    /// Rejected feed credential or caller password
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network failure or non-success response from the event feed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Valid session acting on another caller's raid
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the storage layer itself cannot be reached.
    ///
    /// A reconciliation batch stops instead of moving on to the next event.
    pub fn is_storage_unreachable(&self) -> bool {
        matches!(
            self,
            Error::Storage(sqlx::Error::PoolTimedOut)
                | Error::Storage(sqlx::Error::PoolClosed)
                | Error::Storage(sqlx::Error::Io(_))
        )
    }

    /// True when the underlying database error is a unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Storage(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_failures_are_unreachable() {
        assert!(Error::Storage(sqlx::Error::PoolTimedOut).is_storage_unreachable());
        assert!(Error::Storage(sqlx::Error::PoolClosed).is_storage_unreachable());
        assert!(!Error::Storage(sqlx::Error::RowNotFound).is_storage_unreachable());
        assert!(!Error::Validation("title".to_string()).is_storage_unreachable());
    }

    #[test]
    fn test_display_names_entity() {
        let err = Error::NotFound("raid 42".to_string());
        assert_eq!(err.to_string(), "Not found: raid 42");
    }
}
