//! # Pending Sales
//!
//! Sales accepted while the store was failing. They are already part of
//! the in-memory session; this queue only remembers that their ledger rows
//! (and stock moves) still have to be written.
//!
//! ## Thread Safety
//! Wrapped in `Arc<Mutex<T>>`; the guard is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use till_db::PendingSale;

/// Queue of sales waiting for the store.
#[derive(Debug, Clone, Default)]
pub struct PendingSales {
    queue: Arc<Mutex<Vec<PendingSale>>>,
}

impl PendingSales {
    pub fn new() -> Self {
        PendingSales::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<PendingSale>> {
        // Every critical section is a single Vec call; a poisoned queue is
        // still consistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, pending: PendingSale) {
        self.guard().push(pending);
    }

    /// Copy of the queue, oldest first.
    pub fn snapshot(&self) -> Vec<PendingSale> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn contains(&self, sale_id: &str) -> bool {
        self.guard().iter().any(|p| p.sale.id == sale_id)
    }

    /// Drops the given sales from the queue once they are stored.
    pub fn remove(&self, sale_ids: &[String]) {
        self.guard().retain(|p| !sale_ids.contains(&p.sale.id));
    }

    /// Flips the canceled flag of a queued sale. Returns `false` if the
    /// sale is not queued.
    pub fn set_canceled(&self, sale_id: &str, canceled: bool) -> bool {
        match self.guard().iter_mut().find(|p| p.sale.id == sale_id) {
            Some(pending) => {
                pending.sale.canceled = canceled;
                true
            }
            None => false,
        }
    }
}
