//! # Store Handle
//!
//! Opens the till database, applies the schema and hands out repositories.
//!
//! ## What Lives in the File
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till.db                                                                │
//! │                                                                         │
//! │  products ─────────── catalog; stock and markup value as TEXT decimals  │
//! │  suppliers ────────── registry                                          │
//! │  purchases ────────── ledger; product/supplier ids may dangle           │
//! │  sales ────────────── ledger; `canceled` flag, never deleted            │
//! │  cashbox_sessions ─── one row per session, `snapshot` = session JSON    │
//! │                       partial unique index: at most ONE row with        │
//! │                       closed_at IS NULL                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connections
//! A file store gets a small pool in WAL mode: report reads can run while a
//! purchase or sale transaction is writing. `:memory:` is different: every
//! connection would see its own empty database, so [`DbConfig::in_memory`]
//! pins the pool to exactly one connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::cashbox::CashboxRepository;
use crate::repository::product::ProductRepository;
use crate::repository::purchase::PurchaseRepository;
use crate::repository::report::ReportRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::supplier::SupplierRepository;

const MEMORY_PATH: &str = ":memory:";

/// Connections for a file store.
const FILE_POOL_SIZE: u32 = 4;

/// How long a writer waits on SQLite's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

impl DbConfig {
    /// A file store; the file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: FILE_POOL_SIZE,
        }
    }

    /// A private, empty store that vanishes with the pool. Used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!("sqlite://{}", self.database_path.display()))
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        // Purchases carry no FOREIGN KEYs; the pragma only guards future tables.
        Ok(options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true))
    }
}

/// Handle to the till store. Clones share the pool.
///
/// ```text
/// db.products()   catalog CRUD, search, manual price
/// db.suppliers()  supplier registry
/// db.purchases()  purchase ledger, stock + price reconciliation (tx)
/// db.sales()      sale ledger, sale + session snapshot commit (tx)
/// db.cashbox()    open-session snapshot, closing history
/// db.reports()    windowed reads for the till-core folds
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and brings the schema up to date.
    ///
    /// ## Returns
    /// * `Err(ConnectionFailed)` - The file can't be opened or created
    /// * `Err(MigrationFailed)` - The schema could not be applied
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening till store");

        let options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    /// Raw pool access for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    pub fn purchases(&self) -> PurchaseRepository {
        PurchaseRepository::new(self.pool.clone())
    }

    pub fn cashbox(&self) -> CashboxRepository {
        CashboxRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Closes every connection. Later calls on any clone fail.
    pub async fn close(&self) {
        info!("Closing till store");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_is_single_connection() {
        let config = DbConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);

        let file = DbConfig::new("/tmp/till.db");
        assert!(!file.is_in_memory());
        assert_eq!(file.max_connections, FILE_POOL_SIZE);
    }

    #[tokio::test]
    async fn test_schema_allows_one_open_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let insert = "INSERT INTO cashbox_sessions (id, opened_at, snapshot) VALUES (?1, '2024-01-01T00:00:00Z', '{}')";

        sqlx::query(insert).bind("a").execute(db.pool()).await.unwrap();
        let err: DbError = sqlx::query(insert).bind("b").execute(db.pool()).await.unwrap_err().into();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field.contains("cashbox")));

        sqlx::query("UPDATE cashbox_sessions SET closed_at = '2024-01-01T20:00:00Z' WHERE id = 'a'")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(insert).bind("b").execute(db.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn test_reopening_a_file_store_keeps_data() {
        let path = std::env::temp_dir().join(format!("till-pool-{}.db", std::process::id()));
        let first = Database::new(DbConfig::new(&path)).await.unwrap();
        sqlx::query("INSERT INTO suppliers (id, name, created_at) VALUES ('s-1', 'Mill Co', '2024-01-01T00:00:00Z')")
            .execute(first.pool())
            .await
            .unwrap();
        first.close().await;

        let second = Database::new(DbConfig::new(&path)).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(second.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        second.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
