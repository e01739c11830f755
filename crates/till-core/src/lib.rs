//! # till-core: Pure Business Logic for Till POS
//!
//! This crate is the **heart** of Till POS. It contains all business logic
//! as pure functions and plain data with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (forms, tables, charts)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                till-service commands + state                    │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────┐  ┌────────▼────────────────────┐  │
//! │  │  ★ till-core (THIS CRATE) ★     │  │  till-db (SQLite)           │  │
//! │  │                                 │◄─┤  repositories, transactions │  │
//! │  │  money · types · pricing        │  └─────────────────────────────┘  │
//! │  │  cart · cashbox · reports       │                                   │
//! │  │  validation · error             │                                   │
//! │  └─────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` (integer cents) and `Quantity` (exact decimal)
//! - [`types`] - Domain records (Product, Supplier, Purchase, Sale, ...)
//! - [`pricing`] - Sale price derivation from cost + markup rule
//! - [`cart`] - Line items captured at selection time, tender settlement
//! - [`cashbox`] - The cashbox session aggregate and its single active slot
//! - [`reports`] - Read-only aggregation folds over sales and purchases
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 2. **Integer Money**: Monetary values are cents (i64); quantities are exact decimals
//! 3. **Recompute, don't patch**: Session totals are always folded from the lists
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::cashbox::Cashbox;
//! use till_core::money::Money;
//!
//! let mut cashbox = Cashbox::new();
//! cashbox.open(Money::from_cents(10_000)).unwrap();
//! cashbox.record_income(Money::from_cents(2_000), "Change float").unwrap();
//!
//! let session = cashbox.active().unwrap();
//! assert_eq!(session.totals.expected_total.cents(), 12_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod cashbox;
pub mod error;
pub mod money;
pub mod pricing;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, LineItem, LineMeasure, Tender};
pub use cashbox::{Cashbox, CashboxSession, ClosingRecord, SessionTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Quantity};
pub use pricing::{derive_sale_price, IncrementRule};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Separator used when joining item names into a sale description.
pub const SALE_DESCRIPTION_SEPARATOR: &str = ", ";

/// Default number of rows returned by the top-products report.
pub const DEFAULT_TOP_PRODUCTS_LIMIT: u32 = 10;
