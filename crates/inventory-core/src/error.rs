//! # Error Types
//!
//! Domain-specific error types for inventory-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  inventory-core errors (this file)                                     │
//! │  ├── CoreError        - Item rule violations                           │
//! │  └── ValidationError  - Form / import field failures                   │
//! │                                                                         │
//! │  inventory-db errors (separate crate)                                  │
//! │  └── DbError          - Storage, encryption, migration failures        │
//! │                                                                         │
//! │  inventory-app errors                                                  │
//! │  └── AppError         - What the screens layer sees                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AppError → Screen                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Item rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Selling was requested with nothing left in stock.
    ///
    /// ## When This Occurs
    /// ```text
    /// Item detail: quantity 0
    ///      │
    ///      ▼
    /// Item::sold_one() → OutOfStock { id: 7 }
    ///      │
    ///      ▼
    /// Sell button stays disabled (is_stock_available == false)
    /// ```
    #[error("Item {id} is out of stock")]
    OutOfStock { id: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Produced by the entry gate for form input and for imported records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (number that does not parse, malformed email, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error for a field.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OutOfStock { id: 7 };
        assert_eq!(err.to_string(), "Item 7 is out of stock");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::invalid("provider_email", "not an email address");
        assert_eq!(
            err.to_string(),
            "provider_email has invalid format: not an email address"
        );
        assert_eq!(err.field(), "provider_email");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("price").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
