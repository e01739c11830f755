//! # API Error Type
//!
//! Unified error type for service commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Till POS                               │
//! │                                                                         │
//! │  Presentation layer            Rust service                             │
//! │  ──────────────────            ────────────                             │
//! │                                                                         │
//! │  commit_sale(...)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rule broken? ──── CoreError::NoActiveSession ──────┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Storage failed? ─ DbError::QueryFailed("...") ─► ApiError ────►│  │
//! │  │         │          (logged, message made generic)                │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "NO_ACTIVE_SESSION", "message": "No active cashbox session" }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use till_core::CoreError;
use till_db::error::entity;
use till_db::DbError;

use crate::state::ConfigError;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "PRODUCT_NOT_FOUND",
///   "message": "Product not found: 6f1c..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Amount or quantity out of range
    InvalidAmount,

    /// A required input was absent
    MissingRequiredField,

    ProductNotFound,
    SupplierNotFound,
    PurchaseNotFound,
    SaleNotFound,

    /// Cashbox operation with no open session
    NoActiveSession,

    /// Open requested while a session is open
    SessionAlreadyOpen,

    /// The store failed; details are in the log
    StorageFailure,

    /// Any other field-format failure
    ValidationError,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a storage error with the generic message.
    pub fn storage() -> Self {
        ApiError::new(ErrorCode::StorageFailure, "Storage operation failed")
    }
}

/// Converts database errors to API errors.
///
/// Not-found keeps its entity kind. A unique violation on the cashbox table
/// means a session is already open. Everything else is logged and surfaced
/// as `STORAGE_FAILURE`.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::NotFound { entity: kind, id } => {
                let code = match kind.as_str() {
                    entity::PRODUCT => ErrorCode::ProductNotFound,
                    entity::SUPPLIER => ErrorCode::SupplierNotFound,
                    entity::PURCHASE => ErrorCode::PurchaseNotFound,
                    entity::SALE => ErrorCode::SaleNotFound,
                    entity::CASHBOX_SESSION => ErrorCode::NoActiveSession,
                    _ => {
                        tracing::error!(error = %err, "Unexpected missing row");
                        return ApiError::storage();
                    }
                };
                ApiError::new(code, format!("{} not found: {}", kind, id))
            }
            DbError::Rejected(core) => core.clone().into(),
            DbError::UniqueViolation { field, .. } if field.contains("cashbox") => {
                ApiError::new(ErrorCode::SessionAlreadyOpen, "A cashbox session is already open")
            }
            _ => {
                // Log the actual error but return a generic message
                tracing::error!(error = %err, "Storage operation failed");
                ApiError::storage()
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            CoreError::MissingRequiredField(_) => ErrorCode::MissingRequiredField,
            CoreError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            CoreError::SupplierNotFound(_) => ErrorCode::SupplierNotFound,
            CoreError::PurchaseNotFound(_) => ErrorCode::PurchaseNotFound,
            CoreError::SaleNotFound(_) => ErrorCode::SaleNotFound,
            CoreError::NoActiveSession => ErrorCode::NoActiveSession,
            CoreError::SessionAlreadyOpen { .. } => ErrorCode::SessionAlreadyOpen,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Failures while bringing the service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
