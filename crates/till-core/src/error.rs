//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-service errors                                                   │
//! │  └── ApiError         - What the presentation layer sees               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                         DbError ────┴──► ApiError { code, message }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Folding Validation Into the Taxonomy
//! A missing field and a non-positive amount are first-class kinds for the
//! caller (`MissingRequiredField`, `InvalidAmount`), so the conversion from
//! [`ValidationError`] lifts those two cases out instead of wrapping them.

use chrono::{DateTime, Utc};
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// An amount or quantity is negative, zero where it must be positive,
    /// or otherwise unusable.
    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// A required input was absent.
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Supplier cannot be found.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    /// Purchase cannot be found.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    /// Sale cannot be found (in the ledger or in the active session).
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A session operation was attempted with no open cashbox.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout ──► commit_sale()
    ///      │
    ///      ▼
    /// Cashbox slot empty?
    ///      │
    ///      ▼
    /// NoActiveSession
    ///      │
    ///      ▼
    /// UI shows: "Open the cashbox before recording sales"
    /// ```
    #[error("No cashbox session is open")]
    NoActiveSession,

    /// `open` was called while another session is still open.
    #[error("A cashbox session is already open (opened at {opened_at})")]
    SessionAlreadyOpen { opened_at: DateTime<Utc> },

    /// Any other validation failure (format, length, range).
    #[error("Validation error: {0}")]
    Validation(ValidationError),
}

impl CoreError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a MissingRequiredField error.
    pub fn missing(field: impl Into<String>) -> Self {
        CoreError::MissingRequiredField(field.into())
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Required { field } => CoreError::MissingRequiredField(field),
            ValidationError::MustBePositive { field } => CoreError::InvalidAmount {
                field,
                reason: "must be greater than zero".to_string(),
            },
            ValidationError::MustNotBeNegative { field } => CoreError::InvalidAmount {
                field,
                reason: "must not be negative".to_string(),
            },
            ValidationError::TooLarge { field, max } => CoreError::InvalidAmount {
                field,
                reason: format!("must not exceed {max}"),
            },
            other => CoreError::Validation(other),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value exceeds the largest accepted magnitude.
    #[error("{field} must not exceed {max}")]
    TooLarge { field: String, max: String },

    /// Invalid format (e.g., invalid UUID, invalid decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
        let err = CoreError::invalid_amount("opening", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid amount for opening: must not be negative"
        );
        assert_eq!(
            CoreError::NoActiveSession.to_string(),
            "No cashbox session is open"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooShort {
            field: "barcode".to_string(),
            min: 5,
        };
        assert_eq!(err.to_string(), "barcode must be at least 5 characters");
    }

    #[test]
    fn test_required_becomes_missing_field() {
        let core_err: CoreError = ValidationError::Required {
            field: "product_id".to_string(),
        }
        .into();
        assert_eq!(core_err, CoreError::MissingRequiredField("product_id".into()));
    }

    #[test]
    fn test_positive_becomes_invalid_amount() {
        let core_err: CoreError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::InvalidAmount { ref field, .. } if field == "quantity"));
    }

    #[test]
    fn test_too_large_becomes_invalid_amount() {
        let core_err: CoreError = ValidationError::TooLarge {
            field: "cash".to_string(),
            max: "1000000000.00".to_string(),
        }
        .into();
        assert_eq!(
            core_err.to_string(),
            "Invalid amount for cash: must not exceed 1000000000.00"
        );
    }

    #[test]
    fn test_format_errors_stay_wrapped() {
        let core_err: CoreError = ValidationError::TooLong {
            field: "description".to_string(),
            max: 500,
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
