//! # Application Error Type
//!
//! What the screens layer sees when an operation fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the App Core                           │
//! │                                                                         │
//! │  Form input ── ValidationError ──► returned, nothing submitted         │
//! │                                                                         │
//! │  Store op ──── DbError ──────────► AppError::Db                        │
//! │                   (on the worker: logged with tracing::error!)          │
//! │                                                                         │
//! │  Import file ─ TransferError ────► AppError::Transfer                  │
//! │                                                                         │
//! │  Startup ───── config / key file ► AppError::Config / AppError::Io     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use inventory_core::ValidationError;
use inventory_db::DbError;
use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store failure (connect, unlock, migrate, query).
    #[error(transparent)]
    Db(#[from] DbError),

    /// Form or imported record failed the entry gate.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Import or export failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Configuration missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::Config(message.into())
    }

    /// Machine-readable code for the screens layer.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Db(DbError::NotFound { .. }) => "NOT_FOUND",
            AppError::Db(DbError::WrongPassphrase) => "WRONG_PASSPHRASE",
            AppError::Db(_) => "DATABASE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Transfer(_) => "TRANSFER_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }
}

/// Import / export failures.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The file does not start with the export header.
    #[error("Not an inventory export file")]
    BadMagic,

    /// Written by a newer version.
    #[error("Unsupported export format version {0}")]
    UnsupportedVersion(u8),

    /// Header present but body cut short.
    #[error("Export file is truncated")]
    Truncated,

    /// Wrong device key or tampered file.
    #[error("Export file could not be decrypted")]
    Decryption,

    /// Decrypted body is not a valid item document.
    #[error("Malformed item document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Price in the document cannot be represented.
    #[error("Invalid price in item document: {0}")]
    InvalidPrice(f64),

    /// Quantity in the document cannot be represented.
    #[error("Invalid quantity in item document: {0}")]
    InvalidQuantity(i64),

    /// Sealing or key derivation failed.
    #[error("Could not seal export: {0}")]
    Seal(String),
}

/// Result type for app operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::from(DbError::not_found("Item", 1)).code(), "NOT_FOUND");
        assert_eq!(AppError::from(DbError::WrongPassphrase).code(), "WRONG_PASSPHRASE");
        assert_eq!(
            AppError::from(ValidationError::required("name")).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(AppError::from(TransferError::BadMagic).code(), "TRANSFER_ERROR");
        assert_eq!(AppError::config("missing passphrase").code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_transparent_messages() {
        let err = AppError::from(DbError::not_found("Item", 4));
        assert_eq!(err.to_string(), "Item not found: 4");
    }
}
