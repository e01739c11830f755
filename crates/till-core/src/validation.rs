//! # Validation Module
//!
//! Input validation utilities for Till POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                 │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: till-service command                                         │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation, before any write           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Partial unique index: one open cashbox session                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//! use till_core::validation::{validate_barcode, validate_positive_amount};
//!
//! validate_barcode("7790001001").unwrap();
//! validate_positive_amount("amount", Money::from_cents(500)).unwrap();
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use crate::MAX_CART_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shortest barcode accepted by the catalog.
pub const MIN_BARCODE_LEN: usize = 5;

/// Longest barcode accepted by the catalog.
pub const MAX_BARCODE_LEN: usize = 50;

/// Cap on free-text description and info fields.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Cap on supplier addresses.
pub const MAX_ADDRESS_LEN: usize = 200;

/// Largest single amount accepted anywhere ($1,000,000,000.00).
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000_000);

/// Largest quantity (units or kg) a single line, purchase or stock level
/// may carry.
pub const MAX_QUANTITY_UNITS: i64 = 1_000_000;

/// Largest markup value, in percent points or major units.
pub const MAX_INCREMENT_UNITS: i64 = 1_000_000;

// =============================================================================
// Presence
// =============================================================================

/// Unwraps a required value.
///
/// ## Example
/// ```rust
/// use till_core::validation::require;
///
/// assert_eq!(require("year", Some(2024)).unwrap(), 2024);
/// assert!(require::<i32>("year", None).is_err());
/// ```
pub fn require<T>(field: &str, value: Option<T>) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

/// Unwraps a required text value, treating blank strings as absent.
pub fn require_text(field: &str, value: Option<String>) -> ValidationResult<String> {
    match normalize_optional(value) {
        Some(text) => Ok(text),
        None => Err(ValidationError::Required {
            field: field.to_string(),
        }),
    }
}

/// Trims optional text and collapses blank strings to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

/// Validates a supplier name. Same rules as product names.
pub fn validate_supplier_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a barcode.
///
/// ## Rules
/// - Between 5 and 50 characters
/// - Letters and digits only (scanners emit EAN/UPC digits, some labels
///   carry alphanumeric codes)
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_barcode;
///
/// assert!(validate_barcode("7791234567890").is_ok());
/// assert!(validate_barcode("1234").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();
    let len = barcode.chars().count();

    if len < MIN_BARCODE_LEN {
        return Err(ValidationError::TooShort {
            field: "barcode".to_string(),
            min: MIN_BARCODE_LEN,
        });
    }

    if len > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a supplier contact number.
///
/// ## Rules
/// - 7 to 20 digits once spaces, dashes, dots, parentheses and a leading
///   `+` are stripped
pub fn validate_contact(contact: &str) -> ValidationResult<()> {
    let mut digits = 0usize;
    for (i, c) in contact.trim().chars().enumerate() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '.' | '(' | ')' => {}
            '+' if i == 0 => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "contact".to_string(),
                    reason: "must be a phone number".to_string(),
                })
            }
        }
    }

    if !(7..=20).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "contact digits".to_string(),
            min: 7,
            max: 20,
        });
    }

    Ok(())
}

/// Validates that free text does not exceed `max` characters.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a strictly positive amount.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cashbox: Record Expense                                                │
/// │                                                                         │
/// │  User enters amount: 0.00                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_positive_amount("amount", 0) ← THIS FUNCTION                 │
/// │       │                                                                 │
/// │       ├── amount <= 0? → InvalidAmount                                 │
/// │       │                                                                 │
/// │       └── OK → append to expenses, recompute totals                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    validate_amount_cap(field, amount)
}

/// Validates an amount that may be zero but not negative.
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    validate_amount_cap(field, amount)
}

fn validate_amount_cap(field: &str, amount: Money) -> ValidationResult<()> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: MAX_AMOUNT.to_decimal().to_string(),
        });
    }

    Ok(())
}

/// Validates a strictly positive quantity (units or kg).
pub fn validate_positive_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    validate_magnitude(field, qty.value(), MAX_QUANTITY_UNITS)
}

/// Validates an entered stock level. Negative stock is allowed.
pub fn validate_stock_level(stock: Quantity) -> ValidationResult<()> {
    validate_magnitude("stock", stock.value(), MAX_QUANTITY_UNITS)
}

/// Validates a markup value (percent points or flat amount).
pub fn validate_increment_value(value: Decimal) -> ValidationResult<()> {
    if value < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: "increment_value".to_string(),
        });
    }

    validate_magnitude("increment_value", value, MAX_INCREMENT_UNITS)
}

fn validate_magnitude(field: &str, value: Decimal, max: i64) -> ValidationResult<()> {
    if value.abs() > Decimal::from(max) {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: max.to_string(),
        });
    }

    Ok(())
}

/// Validates a calendar month number.
pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of line items).
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(items: usize) -> ValidationResult<()> {
    if items > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
