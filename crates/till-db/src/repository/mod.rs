//! # Repository Module
//!
//! Database repository implementations for Till POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  till-service command                                                  │
//! │       │                                                                 │
//! │       │  db.purchases().update(id, &valid)                             │
//! │       ▼                                                                 │
//! │  PurchaseRepository                                                    │
//! │  ├── BEGIN                                                             │
//! │  ├── read old purchase + products                                      │
//! │  ├── reverse old stock delta, apply new one, re-derive price           │
//! │  └── COMMIT (or ROLLBACK on any error: nothing half-applied)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Row structs (`*Row`, `sqlx::FromRow`) mirror the table columns;       │
//! │  `TryFrom<Row>` turns TEXT decimals and cents into domain types.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD, search, stock moves
//! - [`supplier::SupplierRepository`] - Supplier registry
//! - [`purchase::PurchaseRepository`] - Purchase ledger with reconciliation
//! - [`sale::SaleRepository`] - Sale ledger and sale commits
//! - [`cashbox::CashboxRepository`] - Session snapshots and closings
//! - [`report::ReportRepository`] - Windowed reads for reporting

pub mod cashbox;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod supplier;

use std::str::FromStr;

use rust_decimal::Decimal;
use till_core::Quantity;

use crate::error::{DbError, DbResult};

/// Parses a TEXT decimal column.
pub(crate) fn parse_decimal(field: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| DbError::corrupt(field, e))
}

/// Parses a TEXT quantity column.
pub(crate) fn parse_quantity(field: &str, raw: &str) -> DbResult<Quantity> {
    parse_decimal(field, raw).map(Quantity::new)
}

/// Builds a `LIKE` pattern matching `term` anywhere, with `\` as escape.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
