//! # Sale Repository
//!
//! The sale ledger. Sales are never deleted; canceling flips a flag.
//!
//! ## Sale Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       commit(sale, session, moves)                      │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT INTO sales                                                │
//! │   ├── UPDATE cashbox_sessions SET snapshot = <session JSON>            │
//! │   └── stock −= quantity   for each StockMove (empty unless the         │
//! │                           decrement-on-sale policy is on)               │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The caller swaps its in-memory session only after COMMIT returns.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{entity, DbError, DbResult};
use crate::repository::{cashbox, product};
use till_core::reports::DateRange;
use till_core::{CashboxSession, LineItem, Money, Quantity, Sale};

const SALE_COLUMNS: &str = "id, description, amount_cents, cash_cents, transfer_cents, canceled, created_at";

/// Raw `sales` row.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    description: String,
    amount_cents: i64,
    cash_cents: i64,
    transfer_cents: i64,
    canceled: bool,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            description: row.description,
            amount: Money::from_cents(row.amount_cents),
            cash: Money::from_cents(row.cash_cents),
            transfer: Money::from_cents(row.transfer_cents),
            canceled: row.canceled,
            created_at: row.created_at,
        }
    }
}

/// Stock taken out of one product by a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMove {
    pub product_id: String,
    pub quantity: Quantity,
}

impl StockMove {
    /// One move per catalog line. Ad-hoc lines have no product and move
    /// nothing.
    pub fn from_items(items: &[LineItem]) -> Vec<StockMove> {
        items
            .iter()
            .filter_map(|item| {
                item.product_id.as_ref().map(|id| StockMove {
                    product_id: id.clone(),
                    quantity: item.measure.amount(),
                })
            })
            .collect()
    }
}

/// A sale kept in memory while the store was failing, with the stock it
/// should move once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSale {
    pub sale: Sale,
    pub moves: Vec<StockMove>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Sale::from))
    }

    /// Inserts a sale on its own, outside any session.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, sale).await
    }

    /// Every sale, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY julianday(created_at) DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Sales inside a window (canceled included), oldest first.
    pub async fn list_between(&self, range: DateRange) -> DbResult<Vec<Sale>> {
        debug!(start = %range.start, end = %range.end, "Listing sales in window");

        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE julianday(created_at) >= julianday(?1) \
               AND julianday(created_at) < julianday(?2) \
             ORDER BY julianday(created_at)"
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Flips the canceled flag in the ledger only.
    pub async fn set_canceled(&self, id: &str, canceled: bool) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_canceled_in(&mut conn, id, canceled).await
    }

    /// Flips the canceled flag and stores the session that reflects it, in
    /// one transaction.
    pub async fn set_canceled_with_session(&self, id: &str, canceled: bool, session: &CashboxSession) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        set_canceled_in(&mut tx, id, canceled).await?;
        cashbox::save_snapshot_in(&mut tx, session).await?;
        tx.commit().await?;

        info!(id = %id, canceled = canceled, "Sale cancel flag updated");
        Ok(())
    }

    /// Persists a completed sale together with the session that now
    /// includes it.
    ///
    /// ## Arguments
    /// * `sale` - The new ledger row
    /// * `session` - Session snapshot after `record_sale`
    /// * `moves` - Stock to take out; pass `&[]` to leave stock alone
    pub async fn commit(&self, sale: &Sale, session: &CashboxSession, moves: &[StockMove]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        insert_in(&mut tx, sale).await?;
        cashbox::save_snapshot_in(&mut tx, session).await?;
        apply_moves_in(&mut tx, moves).await?;

        tx.commit().await?;

        info!(
            id = %sale.id,
            amount = %sale.amount,
            cash = %sale.cash,
            transfer = %sale.transfer,
            stock_moves = moves.len(),
            "Sale committed"
        );
        Ok(())
    }

    /// Writes sales that were kept locally while the store was failing.
    ///
    /// Sales already in the ledger are skipped along with their stock moves.
    /// Returns how many rows were written.
    pub async fn store_pending(&self, pending: &[PendingSale], session: Option<&CashboxSession>) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let mut written: u64 = 0;
        for entry in pending {
            let sale = &entry.sale;
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO sales (
                    id, description, amount_cents, cash_cents, transfer_cents, canceled, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&sale.id)
            .bind(&sale.description)
            .bind(sale.amount.cents())
            .bind(sale.cash.cents())
            .bind(sale.transfer.cents())
            .bind(sale.canceled)
            .bind(sale.created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                debug!(id = %sale.id, "Pending sale already stored");
                continue;
            }
            written += 1;
            apply_moves_in(&mut tx, &entry.moves).await?;
        }
        if let Some(session) = session {
            cashbox::save_snapshot_in(&mut tx, session).await?;
        }

        tx.commit().await?;

        info!(pending = pending.len(), written = written, "Pending sales stored");
        Ok(written)
    }
}

async fn apply_moves_in(conn: &mut SqliteConnection, moves: &[StockMove]) -> DbResult<()> {
    for stock_move in moves {
        match product::adjust_stock_in(conn, &stock_move.product_id, -stock_move.quantity).await {
            Ok(_) => {}
            Err(err) if err.is_not_found(entity::PRODUCT) => {
                warn!(product_id = %stock_move.product_id, "Sold product no longer in catalog, stock not moved");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

async fn insert_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, amount = %sale.amount, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, description, amount_cents, cash_cents, transfer_cents, canceled, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.description)
    .bind(sale.amount.cents())
    .bind(sale.cash.cents())
    .bind(sale.transfer.cents())
    .bind(sale.canceled)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn set_canceled_in(conn: &mut SqliteConnection, id: &str, canceled: bool) -> DbResult<()> {
    let result = sqlx::query("UPDATE sales SET canceled = ?2 WHERE id = ?1")
        .bind(id)
        .bind(canceled)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(entity::SALE, id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rust_decimal_macros::dec;
    use till_core::{Cart, LineMeasure, ProductInput, UnitType};

    async fn open_session(db: &Database) -> CashboxSession {
        let session = CashboxSession::new(Money::from_cents(10_000)).unwrap();
        db.cashbox().insert_open(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_commit_writes_sale_and_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = open_session(&db).await;

        let sale = Sale::new("Bread, Milk", Money::from_cents(2500), Money::from_cents(2500), Money::zero());
        session.record_sale(sale.clone()).unwrap();
        db.sales().commit(&sale, &session, &[]).await.unwrap();

        let ledger = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(ledger.amount.cents(), 2500);
        assert!(!ledger.canceled);
        let stored = db.cashbox().load_open().await.unwrap().unwrap();
        assert_eq!(stored.sales.len(), 1);
        assert_eq!(stored.sales[0].id, sale.id);
        assert_eq!(stored.totals.expected_total.cents(), 12_500);
    }

    #[tokio::test]
    async fn test_commit_moves_stock_when_asked() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = open_session(&db).await;

        let cheese = ProductInput {
            name: "Cheese".to_string(),
            sale_price: Some(Money::from_cents(2000)),
            unit_type: UnitType::Kg,
            stock: Quantity::from_units(10),
            ..Default::default()
        }
        .into_product();
        db.products().insert(&cheese).await.unwrap();

        let mut cart = Cart::new();
        cart.add(LineItem::from_product(&cheese, Quantity::new(dec!(0.75)))).unwrap();
        cart.add(LineItem::ad_hoc(
            "Bag",
            LineMeasure::Unit { quantity: Quantity::from_units(1), unit_price: Money::from_cents(50) },
        ))
        .unwrap();
        let moves = StockMove::from_items(&cart.items);
        assert_eq!(moves.len(), 1);

        let (sale, _) = cart.checkout(Money::from_cents(2000), Money::zero()).unwrap();
        session.record_sale(sale.clone()).unwrap();
        db.sales().commit(&sale, &session, &moves).await.unwrap();

        let stock = db.products().get_by_id(&cheese.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, Quantity::new(dec!(9.25)));
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_duplicate_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = open_session(&db).await;

        let sale = Sale::new("Soda", Money::from_cents(300), Money::from_cents(300), Money::zero());
        db.sales().insert(&sale).await.unwrap();

        session.record_sale(sale.clone()).unwrap();
        assert!(db.sales().commit(&sale, &session, &[]).await.is_err());

        // snapshot untouched
        let stored = db.cashbox().load_open().await.unwrap().unwrap();
        assert!(stored.sales.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_and_reactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut session = open_session(&db).await;

        let sale = Sale::new("Soda", Money::from_cents(300), Money::from_cents(300), Money::zero());
        session.record_sale(sale.clone()).unwrap();
        db.sales().commit(&sale, &session, &[]).await.unwrap();

        session.set_sale_canceled(&sale.id, true).unwrap();
        db.sales().set_canceled_with_session(&sale.id, true, &session).await.unwrap();
        assert!(db.sales().get_by_id(&sale.id).await.unwrap().unwrap().canceled);
        let stored = db.cashbox().load_open().await.unwrap().unwrap();
        assert_eq!(stored.totals.cash_sales_total, Money::zero());

        db.sales().set_canceled(&sale.id, false).await.unwrap();
        assert!(!db.sales().get_by_id(&sale.id).await.unwrap().unwrap().canceled);

        let err = db.sales().set_canceled("missing", true).await.unwrap_err();
        assert!(err.is_not_found(entity::SALE));
    }

    #[tokio::test]
    async fn test_store_pending_skips_existing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = open_session(&db).await;

        let stored = Sale::new("A", Money::from_cents(100), Money::from_cents(100), Money::zero());
        let local = Sale::new("B", Money::from_cents(200), Money::from_cents(200), Money::zero());
        db.sales().insert(&stored).await.unwrap();

        let pending: Vec<PendingSale> = [stored, local]
            .into_iter()
            .map(|sale| PendingSale { sale, moves: Vec::new() })
            .collect();
        let written = db.sales().store_pending(&pending, Some(&session)).await.unwrap();
        assert_eq!(written, 1);
        assert_eq!(db.sales().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_between_is_half_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut sale = Sale::new("Old", Money::from_cents(100), Money::from_cents(100), Money::zero());
        sale.created_at = DateRange::calendar_month(2024, 3).unwrap().start;
        db.sales().insert(&sale).await.unwrap();

        let march = DateRange::calendar_month(2024, 3).unwrap();
        let february = DateRange::calendar_month(2024, 2).unwrap();
        assert_eq!(db.sales().list_between(march).await.unwrap().len(), 1);
        assert!(db.sales().list_between(february).await.unwrap().is_empty());
    }
}
