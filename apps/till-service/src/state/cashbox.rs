//! # Cashbox State
//!
//! Owns the single active cashbox session for this service instance.
//!
//! ## Thread Safety
//! The slot sits behind a `tokio::sync::Mutex` and every session-mutating
//! command holds the guard from its first check until the new session is
//! swapped in. That makes the service a single writer: two commands can
//! never interleave between "persist" and "swap".
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut slot = cashbox.lock().await;                                   │
//! │  let mut next = slot.clone();          ◄── work on a copy               │
//! │  next.record_income(amount, "float")?;                                  │
//! │  db.cashbox().save_snapshot(...).await?;  ◄── fails? slot untouched     │
//! │  *slot = next;                         ◄── swap only after persisting   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::{Mutex, MutexGuard};

use till_core::{Cashbox, CashboxSession};

/// The service's cashbox slot.
#[derive(Debug, Default)]
pub struct CashboxState {
    slot: Mutex<Cashbox>,
}

impl CashboxState {
    /// An empty slot (no session open).
    pub fn new() -> Self {
        CashboxState::default()
    }

    /// A slot holding the session found open in the store at startup.
    pub fn restore(active: Option<CashboxSession>) -> Self {
        CashboxState {
            slot: Mutex::new(Cashbox::restore(active)),
        }
    }

    /// Acquires exclusive access to the slot.
    pub async fn lock(&self) -> MutexGuard<'_, Cashbox> {
        self.slot.lock().await
    }

    /// Copy of the open session, if any.
    pub async fn current(&self) -> Option<CashboxSession> {
        self.slot.lock().await.active().cloned()
    }
}
