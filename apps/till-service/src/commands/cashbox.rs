//! # Cashbox Commands
//!
//! Session lifecycle: open, record movements, cancel sales, close.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lock slot ──► clone ──► mutate clone ──► persist ──► swap into slot    │
//! │                              │                │                         │
//! │                              ▼                ▼                         │
//! │                        CoreError        DbError                         │
//! │                     (nothing written) (slot untouched)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The slot lock is held for the whole command, so the in-memory session and
//! the stored snapshot never diverge.

use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CashboxState, DbState, PendingSales};
use till_core::{Cashbox, CashboxSession, ClosingRecord, CoreError, Money, Sale};

/// Closings returned by [`list_closings`] when no limit is given.
pub const DEFAULT_CLOSINGS_LIMIT: u32 = 20;

/// Opens a new session with the given float.
///
/// ## Returns
/// * `Err(SESSION_ALREADY_OPEN)` - A session is open; it stays as it was
/// * `Err(INVALID_AMOUNT)` - `opening` is negative
pub async fn open_session(db: &DbState, cashbox: &CashboxState, opening: Money) -> Result<CashboxSession, ApiError> {
    debug!(opening = %opening, "open_session command");

    let mut slot = cashbox.lock().await;
    let mut next = slot.clone();
    let session = next.open(opening)?.clone();

    db.inner().cashbox().insert_open(&session).await?;
    *slot = next;

    Ok(session)
}

/// Closes the open session against the counted cash.
///
/// Sales still queued locally are written first so the closing snapshot and
/// the ledger agree; if that fails the session stays open.
pub async fn close_session(
    db: &DbState,
    cashbox: &CashboxState,
    pending: &PendingSales,
    physical_cash: Money,
) -> Result<ClosingRecord, ApiError> {
    debug!(physical_cash = %physical_cash, "close_session command");

    let mut slot = cashbox.lock().await;
    if !slot.is_open() {
        return Err(CoreError::NoActiveSession.into());
    }
    if !pending.is_empty() {
        store_pending(db, &slot, pending).await?;
    }

    let mut next = slot.clone();
    let record = next.close(physical_cash)?;

    db.inner().cashbox().close(&record).await?;
    *slot = next;

    Ok(record)
}

/// The open session, if any.
pub async fn current_session(cashbox: &CashboxState) -> Result<Option<CashboxSession>, ApiError> {
    Ok(cashbox.current().await)
}

/// Closed sessions, most recent first.
pub async fn list_closings(db: &DbState, limit: Option<u32>) -> Result<Vec<ClosingRecord>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_CLOSINGS_LIMIT);
    Ok(db.inner().cashbox().list_closings(limit).await?)
}

pub async fn last_closing(db: &DbState) -> Result<Option<ClosingRecord>, ApiError> {
    Ok(db.inner().cashbox().last_closing().await?)
}

/// Records an already-built sale in the open session.
///
/// A sale the ledger doesn't know yet is inserted with the new snapshot; a
/// known one (re-recorded after an edit) only refreshes the snapshot.
pub async fn record_sale(db: &DbState, cashbox: &CashboxState, sale: Sale) -> Result<CashboxSession, ApiError> {
    debug!(id = %sale.id, amount = %sale.amount, "record_sale command");

    let mut slot = cashbox.lock().await;
    let mut next = slot.clone();
    let session = next.record_sale(sale.clone())?.clone();

    let sales = db.inner().sales();
    if sales.get_by_id(&sale.id).await?.is_some() {
        db.inner().cashbox().save_snapshot(&session).await?;
    } else {
        sales.commit(&sale, &session, &[]).await?;
    }
    *slot = next;

    Ok(session)
}

/// Adds cash put into the drawer.
pub async fn record_income(
    db: &DbState,
    cashbox: &CashboxState,
    amount: Money,
    description: String,
) -> Result<CashboxSession, ApiError> {
    debug!(amount = %amount, "record_income command");
    mutate_and_save(db, cashbox, |next| next.record_income(amount, &description).cloned()).await
}

/// Adds cash taken out of the drawer.
pub async fn record_expense(
    db: &DbState,
    cashbox: &CashboxState,
    amount: Money,
    description: String,
) -> Result<CashboxSession, ApiError> {
    debug!(amount = %amount, "record_expense command");
    mutate_and_save(db, cashbox, |next| next.record_expense(amount, &description).cloned()).await
}

/// Cancels or restores a sale of the open session.
///
/// ## Returns
/// * `Err(SALE_NOT_FOUND)` - The sale is not part of the open session
/// * `Err(NO_ACTIVE_SESSION)` - No session is open
///
/// Setting the flag to its current value is a no-op that still succeeds.
pub async fn set_sale_canceled(
    db: &DbState,
    cashbox: &CashboxState,
    pending: &PendingSales,
    sale_id: String,
    canceled: bool,
) -> Result<CashboxSession, ApiError> {
    debug!(sale_id = %sale_id, canceled = canceled, "set_sale_canceled command");

    let mut slot = cashbox.lock().await;
    let mut next = slot.clone();
    let session = next.set_sale_canceled(&sale_id, canceled)?.clone();

    if pending.contains(&sale_id) {
        // Not in the ledger yet; the queued copy carries the flag.
        db.inner().cashbox().save_snapshot(&session).await?;
        pending.set_canceled(&sale_id, canceled);
    } else {
        db.inner()
            .sales()
            .set_canceled_with_session(&sale_id, canceled, &session)
            .await?;
    }
    *slot = next;

    info!(sale_id = %sale_id, canceled = canceled, expected = %session.expected_total(), "Sale cancel flag set");
    Ok(session)
}

async fn mutate_and_save<F>(db: &DbState, cashbox: &CashboxState, mutate: F) -> Result<CashboxSession, ApiError>
where
    F: FnOnce(&mut Cashbox) -> Result<CashboxSession, CoreError>,
{
    let mut slot = cashbox.lock().await;
    let mut next = slot.clone();
    let session = mutate(&mut next)?;

    db.inner().cashbox().save_snapshot(&session).await?;
    *slot = next;

    Ok(session)
}

/// Writes queued sales with the current session snapshot and drops them
/// from the queue. The caller holds the slot lock.
pub(crate) async fn store_pending(db: &DbState, slot: &Cashbox, pending: &PendingSales) -> Result<u64, ApiError> {
    let queued = pending.snapshot();
    if queued.is_empty() {
        return Ok(0);
    }

    let written = db.inner().sales().store_pending(&queued, slot.active()).await?;
    let ids: Vec<String> = queued.into_iter().map(|p| p.sale.id).collect();
    pending.remove(&ids);

    info!(written = written, "Pending sales flushed");
    Ok(written)
}
