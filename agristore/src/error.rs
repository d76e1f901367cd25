//! Error types for agristore
//!
//! Storage errors are wrapped once and otherwise passed through to the caller
//! unchanged. Lookups never produce a "not found" error; they return `None` or
//! an empty list instead.

use thiserror::Error;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite driver errors, including row conversion failures
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors (timeouts, failed connection setup)
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Errors raised while assembling a statement
    #[error("Query build error: {0}")]
    QueryBuild(#[from] sea_query::error::Error),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requests the engine cannot execute, such as a zero page size
    #[error("Validation error: {0}")]
    Validation(String),
}

impl StoreError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Stored text that does not name a variant of a classification enum
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = StoreError::validation("page size must be positive");
        assert_eq!(
            err.to_string(),
            "Validation error: page size must be positive"
        );
    }

    #[test]
    fn test_config_error() {
        let err = StoreError::config("pool size must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: pool size must be positive"
        );
    }

    #[test]
    fn test_database_error_passes_through() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(
            err,
            StoreError::Database(rusqlite::Error::QueryReturnedNoRows)
        ));
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = UnknownVariant::new("TransactionStatus", "LOST");
        assert_eq!(err.to_string(), "unknown TransactionStatus value: LOST");
    }
}
