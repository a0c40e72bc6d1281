//! # Database Error Types
//!
//! Error type for every operation in this crate.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Business rule (CoreError)          │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  DbError (this module) ◄────────────────────┘                           │
//! │       │                                                                 │
//! │       │  transaction dropped → ROLLBACK                                 │
//! │       ▼                                                                 │
//! │  Boundary layer: kind() → HTTP status, to_string() → message           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use meridian_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate SKU or branch code
    /// - Second inventory record for the same branch/product
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Could not open or commit a transaction (lock wait exhausted, etc.).
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Stable category for the boundary layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Domain(err) => err.kind(),
            DbError::UniqueViolation { .. } => ErrorKind::Validation,
            DbError::ForeignKeyViolation { .. } => ErrorKind::BusinessRule,
            _ => ErrorKind::Internal,
        }
    }

    /// The business error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, DbError::ForeignKeyViolation { .. })
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (unique)   → DbError::UniqueViolation
/// sqlx::Error::Database (FK)       → DbError::ForeignKeyViolation
/// sqlx::Error::Database (other)    → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut        → DbError::PoolExhausted
/// Other                            → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                // "UNIQUE constraint failed: <table>.<column>"
                let field = db_err
                    .message()
                    .split("UNIQUE constraint failed: ")
                    .nth(1)
                    .unwrap_or("unknown")
                    .to_string();
                DbError::UniqueViolation {
                    field,
                    value: "unknown".to_string(),
                }
            }

            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                }
            }

            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::BeginFailed => {
                DbError::TransactionFailed("could not begin transaction".to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_passes_through_domain() {
        let err: DbError = CoreError::EmptySale.into();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(err.as_domain().is_some());

        let err: DbError = CoreError::TransferNotFound("t1".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Stock transfer not found: t1");

        let err: DbError = ValidationError::Required {
            field: "sku".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_storage_errors_are_internal() {
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Internal);
        assert_eq!(
            DbError::QueryFailed("boom".into()).kind().http_status(),
            500
        );
        assert!(DbError::duplicate("sku", "A").is_unique_violation());
    }
}
