//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `till-db` contains a `SqlitePool` which
//! is inherently thread-safe. Read-only commands run concurrently without
//! explicit locking; session-mutating commands are serialized by
//! [`CashboxState`](super::CashboxState), not here.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn search_products(db: &DbState, query: String, limit: Option<u32>)
//!     -> Result<Vec<Product>, ApiError>
//! {
//!     Ok(db.inner().products().search(&query, limit.unwrap_or(20)).await?)
//! }
//! ```

use till_db::Database;

/// Wrapper around `Database` for service state.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
