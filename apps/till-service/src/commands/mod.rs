//! # Commands Module
//!
//! Every operation the service exposes to a presentation layer.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── cashbox.rs   ◄─── Session open/close, incomes, expenses, cancel
//! ├── sale.rs      ◄─── Sale commit, local fallback flush, ledger
//! ├── purchase.rs  ◄─── Stock arrivals with repricing
//! ├── product.rs   ◄─── Catalog search and CRUD
//! ├── supplier.rs  ◄─── Supplier registry
//! └── report.rs    ◄─── Read-only aggregates
//! ```
//!
//! ## How Commands Work
//! Each command is a plain `async fn` that declares only the state it
//! needs and returns `Result<T, ApiError>`:
//! ```rust,ignore
//! // Only needs database
//! async fn search_products(db: &DbState, query: String, limit: Option<u32>)
//!
//! // Mutates the session
//! async fn record_income(db: &DbState, cashbox: &CashboxState, amount: Money, description: String)
//!
//! // Reads policy flags too
//! async fn commit_sale(db: &DbState, cashbox: &CashboxState, config: &ConfigState,
//!                      pending: &PendingSales, request: CommitSaleRequest)
//! ```
//!
//! Inputs and outputs are serde types (camelCase), so a desktop shell or an
//! HTTP layer can wrap them without glue.

pub mod cashbox;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod supplier;
