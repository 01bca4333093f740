//! # Database Error Types
//!
//! Error types for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / aes-gcm / std::io::Error                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AppError (inventory-app) ← Logged by the store worker                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Record not found.
    ///
    /// ## When This Occurs
    /// - `update` / `delete` of an identifier that has no row
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration or plaintext → encrypted migration failed.
    ///
    /// For the encryption migration the message names the paths involved;
    /// any `-backup` file it mentions is left on disk for manual recovery.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The passphrase does not unlock this store.
    #[error("Passphrase does not match the store key")]
    WrongPassphrase,

    /// A sealed blob failed authentication or was truncated.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Sealing or key derivation failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The store file exists but is not a database this crate understands.
    #[error("Unrecognized store file: {0}")]
    UnrecognizedStore(String),

    /// Row payload could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File system error outside of SQLite.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a MigrationFailed error for a failed file step.
    pub fn migration_step(step: &str, from: &Path, to: &Path, err: std::io::Error) -> Self {
        DbError::MigrationFailed(format!(
            "could not {} {} to {}: {}",
            step,
            from.display(),
            to.display(),
            err
        ))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::Io             → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // SQLite reports a foreign / encrypted file this way.
                if msg.contains("file is not a database") {
                    DbError::UnrecognizedStore(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

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
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Item", 7);
        assert_eq!(err.to_string(), "Item not found: 7");
    }

    #[test]
    fn test_migration_step_names_paths() {
        let err = DbError::migration_step(
            "rename",
            &PathBuf::from("/data/item_database-encrypting"),
            &PathBuf::from("/data/item_database"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Migration failed: could not rename"));
        assert!(msg.contains("item_database-encrypting"));
        assert!(msg.ends_with("denied"));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
