//! # Till Service Library
//!
//! Service layer of Till POS: loads configuration, opens the store, owns
//! the active cashbox session and exposes every operation as a command.
//!
//! ## Module Organization
//! ```text
//! till_service/
//! ├── lib.rs          ◄─── You are here (startup & tracing)
//! ├── main.rs         ◄─── `till` binary
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cashbox.rs  ◄─── Active session slot (single writer)
//! │   ├── pending.rs  ◄─── Sales kept locally while the store fails
//! │   └── config.rs   ◄─── TOML + env configuration
//! ├── commands/       ◄─── cashbox, sale, purchase, product, supplier, report
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management (Multiple State Types)
//! Instead of a single `AppState` blob, [`TillService`] holds one value per
//! concern and each command borrows only the ones it needs.

pub mod commands;
pub mod error;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use error::StartupError;
use state::{CashboxState, ConfigState, DbState, PendingSales};
use till_db::{Database, DbConfig};

/// A running service instance.
#[derive(Debug)]
pub struct TillService {
    pub db: DbState,
    pub cashbox: CashboxState,
    pub config: ConfigState,
    pub pending: PendingSales,
}

impl TillService {
    /// Starts the service against the configured database file.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │                       Service Startup                                   │
    /// │                                                                         │
    /// │  1. Determine Database Path ──────────────────────────────────────────► │
    /// │     • database.path / TILL_DB_PATH if set                               │
    /// │     • else the platform data dir, e.g.                                  │
    /// │       Linux: ~/.local/share/pos/till.db                                 │
    /// │                                                                         │
    /// │  2. Create the data directory if needed                                 │
    /// │                                                                         │
    /// │  3. Connect to Database ──────────────────────────────────────────────► │
    /// │     • SQLite with WAL mode                                              │
    /// │     • Run pending migrations                                            │
    /// │                                                                         │
    /// │  4. Restore the session left open by the previous run                   │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn start(config: ConfigState) -> Result<Self, StartupError> {
        let db_path = config.database_path()?;
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StartupError::DataDir {
                path: dir.display().to_string(),
                source,
            })?;
        }
        info!(?db_path, "Database path determined");

        TillService::start_with(config, DbConfig::new(db_path)).await
    }

    /// Starts the service with explicit pool settings (tests use
    /// [`DbConfig::in_memory`]).
    pub async fn start_with(config: ConfigState, db_config: DbConfig) -> Result<Self, StartupError> {
        let db = Database::new(db_config).await?;
        info!("Database connected and migrations applied");

        let open = db.cashbox().load_open().await?;
        if let Some(session) = &open {
            info!(
                id = %session.id,
                opened_at = %session.opened_at,
                expected = %session.expected_total(),
                "Resuming open cashbox session"
            );
        }

        Ok(TillService {
            db: DbState::new(db),
            cashbox: CashboxState::restore(open),
            config,
            pending: PendingSales::new(),
        })
    }

    /// Closes the connection pool. Queued local sales are not written.
    pub async fn shutdown(&self) {
        if !self.pending.is_empty() {
            tracing::warn!(pending = self.pending.len(), "Shutting down with sales still queued locally");
        }
        self.db.inner().close().await;
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till_db=trace` - Show trace for the store only
/// - Default: INFO, sqlx at WARN
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::Money;

    #[tokio::test]
    async fn test_start_with_empty_store() {
        let service = TillService::start_with(ConfigState::default(), DbConfig::in_memory())
            .await
            .unwrap();
        assert!(service.cashbox.current().await.is_none());
        assert!(service.pending.is_empty());
    }

    #[tokio::test]
    async fn test_start_restores_open_session() {
        let dir = std::env::temp_dir().join(format!("till-start-{}", std::process::id()));
        let mut config = ConfigState::default();
        config.database.path = Some(dir.join("till.db"));

        let first = TillService::start(config.clone()).await.unwrap();
        let opened = commands::cashbox::open_session(&first.db, &first.cashbox, Money::from_cents(5_000))
            .await
            .unwrap();
        first.shutdown().await;

        let second = TillService::start(config).await.unwrap();
        let restored = second.cashbox.current().await.unwrap();
        assert_eq!(restored.id, opened.id);
        assert_eq!(restored.expected_total(), Money::from_cents(5_000));
        second.shutdown().await;

        let _ = std::fs::remove_dir_all(dir);
    }
}
