//! Common error types for MGEOps

use thiserror::Error;

/// Common result type for MGEOps operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across MGEOps services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identifier string could not be parsed in any supported encoding
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Identifier arithmetic out of representable range
    #[error("Not convertible: {0}")]
    NotConvertible(String),

    /// Alt-link graph invariant violation (an id cannot be both alt and main)
    #[error("Conflicting role: {0}")]
    ConflictingRole(String),

    /// Attempt to link an account to itself
    #[error("Alt cannot equal main")]
    SelfLink,

    /// Transactional write failed; no partial state was committed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks the required role
    #[error("Forbidden")]
    Forbidden,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
