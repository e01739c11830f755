//! # Sale Commands
//!
//! Turning a cart into a committed sale.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         commit_sale                                     │
//! │                                                                         │
//! │  lock slot ── no session? ──► NO_ACTIVE_SESSION (nothing written)       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Cart::checkout(cash, transfer) ── empty / negative ──► error           │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  record_sale on a clone of the session                                  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  sales().commit(sale, session, moves)   one transaction                 │
//! │      │                                                                  │
//! │      ├── Ok ───────────────────────────────► swap, stored_locally=false │
//! │      │                                                                  │
//! │      └── Err ── offline_fallback on? ──yes─► queue, swap,               │
//! │                        │                    stored_locally=true         │
//! │                        no                                               │
//! │                        ▼                                                │
//! │                  STORAGE_FAILURE (session untouched)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::cashbox::store_pending;
use crate::error::ApiError;
use crate::state::{CashboxState, ConfigState, DbState, PendingSales};
use till_core::{Cart, CashboxSession, CoreError, LineItem, Money, Sale, Tender};
use till_db::{PendingSale, StockMove};

/// Lines and payments handed over at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSaleRequest {
    /// Lines with the prices captured when they were added.
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub cash_paid: Money,
    #[serde(default)]
    pub transfer_paid: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: Sale,
    pub tender: Tender,
    /// The session after the sale.
    pub session: CashboxSession,
    /// The ledger row is still queued in memory.
    pub stored_locally: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushResult {
    /// Rows newly written to the ledger.
    pub written: u64,
    /// Sales still queued afterwards.
    pub remaining: usize,
}

/// Commits a sale against the open session.
///
/// ## Returns
/// * `Ok(SaleReceipt)` - Sale stored (or queued) and session updated
/// * `Err(NO_ACTIVE_SESSION)` - Checked before anything else
/// * `Err(MISSING_REQUIRED_FIELD)` - Empty cart
/// * `Err(INVALID_AMOUNT)` - Negative payment or non-positive quantity
/// * `Err(STORAGE_FAILURE)` - Store failed and the local fallback is off
pub async fn commit_sale(
    db: &DbState,
    cashbox: &CashboxState,
    config: &ConfigState,
    pending: &PendingSales,
    request: CommitSaleRequest,
) -> Result<SaleReceipt, ApiError> {
    debug!(
        items = request.items.len(),
        cash = %request.cash_paid,
        transfer = %request.transfer_paid,
        "commit_sale command"
    );

    let mut slot = cashbox.lock().await;
    if !slot.is_open() {
        return Err(CoreError::NoActiveSession.into());
    }

    let cart = Cart::from_items(request.items);
    let (sale, tender) = cart.checkout(request.cash_paid, request.transfer_paid)?;

    let mut next = slot.clone();
    let session = next.record_sale(sale.clone())?.clone();

    let moves = if config.stock.decrement_on_sale {
        StockMove::from_items(&cart.items)
    } else {
        Vec::new()
    };

    let result = db.inner().sales().commit(&sale, &session, &moves).await;
    let stored_locally = match result {
        Ok(()) => false,
        Err(err) if config.sales.offline_fallback => {
            warn!(id = %sale.id, error = %err, "Store failed, sale kept locally");
            pending.push(PendingSale {
                sale: sale.clone(),
                moves,
            });
            true
        }
        Err(err) => return Err(err.into()),
    };
    *slot = next;

    info!(
        id = %sale.id,
        amount = %sale.amount,
        change = %tender.change,
        stored_locally = stored_locally,
        "Sale completed"
    );

    Ok(SaleReceipt {
        sale,
        tender,
        session,
        stored_locally,
    })
}

/// Writes every locally queued sale, with the current session snapshot.
pub async fn flush_pending_sales(
    db: &DbState,
    cashbox: &CashboxState,
    pending: &PendingSales,
) -> Result<FlushResult, ApiError> {
    debug!(queued = pending.len(), "flush_pending_sales command");

    let slot = cashbox.lock().await;
    let written = store_pending(db, &slot, pending).await?;

    Ok(FlushResult {
        written,
        remaining: pending.len(),
    })
}

/// The sale ledger, newest first.
pub async fn list_sales(db: &DbState) -> Result<Vec<Sale>, ApiError> {
    Ok(db.inner().sales().list().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cashbox::{open_session, set_sale_canceled};
    use crate::error::ErrorCode;
    use rust_decimal_macros::dec;
    use till_core::{LineMeasure, ProductInput, Quantity, UnitType};
    use till_db::{Database, DbConfig};

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    struct Fixture {
        db: DbState,
        cashbox: CashboxState,
        config: ConfigState,
        pending: PendingSales,
    }

    async fn fixture(config: ConfigState) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Fixture {
            db: DbState::new(db),
            cashbox: CashboxState::new(),
            config,
            pending: PendingSales::new(),
        }
    }

    fn bread_line() -> LineItem {
        LineItem::ad_hoc(
            "Bread",
            LineMeasure::Unit {
                quantity: Quantity::from_units(2),
                unit_price: cents(150),
            },
        )
    }

    async fn commit(f: &Fixture, items: Vec<LineItem>, cash: i64, transfer: i64) -> Result<SaleReceipt, ApiError> {
        commit_sale(
            &f.db,
            &f.cashbox,
            &f.config,
            &f.pending,
            CommitSaleRequest {
                items,
                cash_paid: cents(cash),
                transfer_paid: cents(transfer),
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_commit_requires_session_before_anything() {
        let f = fixture(ConfigState::default()).await;

        // Even an empty cart reports the missing session first.
        let err = commit(&f, Vec::new(), 0, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoActiveSession);
        assert!(list_sales(&f.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_stores_sale_and_snapshot() {
        let f = fixture(ConfigState::default()).await;
        open_session(&f.db, &f.cashbox, cents(1_000)).await.unwrap();

        let receipt = commit(&f, vec![bread_line()], 500, 0).await.unwrap();
        assert_eq!(receipt.sale.amount, cents(300));
        assert_eq!(receipt.tender.cash, cents(300));
        assert_eq!(receipt.tender.change, cents(200));
        assert!(!receipt.stored_locally);
        assert_eq!(receipt.session.expected_total(), cents(1_300));

        let stored = f.db.inner().sales().get_by_id(&receipt.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.description, "Bread");
        let snapshot = f.db.inner().cashbox().load_open().await.unwrap().unwrap();
        assert_eq!(snapshot.sales.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_out_of_range_payment() {
        let f = fixture(ConfigState::default()).await;
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();

        let err = commit(&f, vec![bread_line()], i64::MAX, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);
        assert!(f.cashbox.current().await.unwrap().sales.is_empty());
        assert!(list_sales(&f.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_rejects_empty_cart_and_negative_payment() {
        let f = fixture(ConfigState::default()).await;
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();

        let err = commit(&f, Vec::new(), 0, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);

        let err = commit(&f, vec![bread_line()], -1, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);

        let session = f.cashbox.current().await.unwrap();
        assert!(session.sales.is_empty());
    }

    #[tokio::test]
    async fn test_stock_untouched_by_default() {
        let f = fixture(ConfigState::default()).await;
        let product = ProductInput {
            name: "Cheese".to_string(),
            purchase_price: cents(1_000),
            stock: Quantity::new(dec!(5)),
            unit_type: UnitType::Kg,
            ..Default::default()
        }
        .into_product();
        f.db.inner().products().insert(&product).await.unwrap();
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();

        let line = LineItem::from_product(&product, Quantity::new(dec!(0.5)));
        commit(&f, vec![line], 0, 0).await.unwrap();

        let after = f.db.inner().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock, Quantity::new(dec!(5)));
    }

    #[tokio::test]
    async fn test_stock_decrement_policy() {
        let mut config = ConfigState::default();
        config.stock.decrement_on_sale = true;
        let f = fixture(config).await;
        let product = ProductInput {
            name: "Cheese".to_string(),
            purchase_price: cents(1_000),
            stock: Quantity::new(dec!(5)),
            unit_type: UnitType::Kg,
            ..Default::default()
        }
        .into_product();
        f.db.inner().products().insert(&product).await.unwrap();
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();

        let line = LineItem::from_product(&product, Quantity::new(dec!(1.25)));
        commit(&f, vec![line, bread_line()], 0, 0).await.unwrap();

        let after = f.db.inner().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock, Quantity::new(dec!(3.75)));
    }

    #[tokio::test]
    async fn test_storage_failure_without_fallback_leaves_session() {
        let f = fixture(ConfigState::default()).await;
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();
        f.db.inner().close().await;

        let err = commit(&f, vec![bread_line()], 300, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageFailure);
        assert!(f.cashbox.current().await.unwrap().sales.is_empty());
        assert!(f.pending.is_empty());
    }

    #[tokio::test]
    async fn test_local_fallback_queues_sale() {
        let mut config = ConfigState::default();
        config.sales.offline_fallback = true;
        let f = fixture(config).await;
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();
        f.db.inner().close().await;

        let receipt = commit(&f, vec![bread_line()], 300, 0).await.unwrap();
        assert!(receipt.stored_locally);
        assert_eq!(f.pending.len(), 1);
        assert_eq!(f.cashbox.current().await.unwrap().sales.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_writes_queue_once() {
        let f = fixture(ConfigState::default()).await;
        open_session(&f.db, &f.cashbox, cents(0)).await.unwrap();

        // Queue a sale by hand as the fallback would.
        let sale = Sale::new("Bread", cents(300), cents(300), Money::zero());
        {
            let mut slot = f.cashbox.lock().await;
            slot.record_sale(sale.clone()).unwrap();
        }
        f.pending.push(PendingSale {
            sale: sale.clone(),
            moves: Vec::new(),
        });

        // Canceling a queued sale only touches the queued copy.
        set_sale_canceled(&f.db, &f.cashbox, &f.pending, sale.id.clone(), true)
            .await
            .unwrap();

        let result = flush_pending_sales(&f.db, &f.cashbox, &f.pending).await.unwrap();
        assert_eq!(result, FlushResult { written: 1, remaining: 0 });
        let stored = f.db.inner().sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert!(stored.canceled);

        let again = flush_pending_sales(&f.db, &f.cashbox, &f.pending).await.unwrap();
        assert_eq!(again.written, 0);
    }
}
