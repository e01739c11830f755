//! # State Module
//!
//! Service state, one type per concern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │   DbState    │  │ CashboxState │  │ ConfigState  │  │PendingSales │  │
//! │  │              │  │              │  │              │  │             │  │
//! │  │  Database    │  │  Mutex<      │  │  store       │  │ Arc<Mutex<  │  │
//! │  │  (SQLite     │  │    Cashbox   │  │  stock       │  │  Vec<..>    │  │
//! │  │   pool)      │  │  >           │  │  sales       │  │ >>          │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • CashboxState: async Mutex held for a whole session command          │
//! │  • ConfigState: Read-only after initialization                         │
//! │  • PendingSales: short std Mutex sections, never across an await      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take only the state they need, so read-only commands never
//! contend with the cashbox lock.

mod cashbox;
mod config;
mod db;
mod pending;

pub use cashbox::CashboxState;
pub use config::{default_config_path, ConfigError, ConfigState};
pub use db::DbState;
pub use pending::PendingSales;
