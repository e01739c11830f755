//! # Purchase Repository
//!
//! The purchase ledger and its effect on the catalog.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Purchase → Product effects                          │
//! │                                                                         │
//! │  create(p)          stock(p.product) += p.quantity                     │
//! │                     purchase_price    = p.unit_cost                    │
//! │                     sale_price        = derive(unit_cost, rule)        │
//! │                     unit_type         = p.unit_type ?? product's       │
//! │                                                                         │
//! │  update(old → new)  same product:   stock += new.qty − old.qty         │
//! │                                     reprice from new                    │
//! │                     other product:  stock(old) −= old.qty              │
//! │                                     stock(new) += new.qty, reprice     │
//! │                                                                         │
//! │  delete(p)          stock(p.product) −= p.quantity   (prices kept)     │
//! │                                                                         │
//! │  Each row is ONE transaction: a failure on any step rolls back all.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Purchases keep their `product_id`/`supplier_id` after the referenced
//! record is deleted. Reversing a purchase whose product is gone only
//! touches the ledger.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{entity, DbError, DbResult};
use crate::repository::{parse_quantity, product, supplier};
use till_core::reports::DateRange;
use till_core::{Money, Product, Purchase, PurchaseView, Quantity, UnitType, ValidPurchase};

const VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.product_id, p.supplier_id, p.quantity,
        p.unit_cost_cents, p.total_cents, p.unit_type,
        p.cash_cents, p.transfer_cents, p.created_at,
        pr.name AS product_name,
        s.name AS supplier_name
    FROM purchases p
    LEFT JOIN products pr ON pr.id = p.product_id
    LEFT JOIN suppliers s ON s.id = p.supplier_id
"#;

/// Raw `purchases` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PurchaseRow {
    id: String,
    product_id: String,
    supplier_id: String,
    quantity: String,
    unit_cost_cents: i64,
    total_cents: i64,
    unit_type: UnitType,
    cash_cents: i64,
    transfer_cents: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = DbError;

    fn try_from(row: PurchaseRow) -> DbResult<Self> {
        Ok(Purchase {
            quantity: parse_quantity("purchases.quantity", &row.quantity)?,
            id: row.id,
            product_id: row.product_id,
            supplier_id: row.supplier_id,
            unit_cost: Money::from_cents(row.unit_cost_cents),
            total: Money::from_cents(row.total_cents),
            unit_type: row.unit_type,
            cash: Money::from_cents(row.cash_cents),
            transfer: Money::from_cents(row.transfer_cents),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseViewRow {
    #[sqlx(flatten)]
    purchase: PurchaseRow,
    product_name: Option<String>,
    supplier_name: Option<String>,
}

impl TryFrom<PurchaseViewRow> for PurchaseView {
    type Error = DbError;

    fn try_from(row: PurchaseViewRow) -> DbResult<Self> {
        Ok(PurchaseView {
            purchase: Purchase::try_from(row.purchase)?,
            product_name: row.product_name,
            supplier_name: row.supplier_name,
        })
    }
}

/// Repository for the purchase ledger.
///
/// ## Usage
/// ```rust,ignore
/// let valid = input.validate()?;
/// let view = db.purchases().create(&valid).await?;
/// println!("{} now costs {}", view.product_name.unwrap_or_default(), view.purchase.unit_cost);
/// ```
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records a purchase and applies it to its product.
    ///
    /// ## Returns
    /// * `Ok(PurchaseView)` - Committed purchase with names resolved
    /// * `Err(DbError::NotFound)` - Product or supplier doesn't exist
    pub async fn create(&self, valid: &ValidPurchase) -> DbResult<PurchaseView> {
        let mut tx = self.pool.begin().await?;

        let target = product::require_in(&mut tx, &valid.product_id).await?;
        require_supplier_in(&mut tx, &valid.supplier_id).await?;

        let purchase = Purchase {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: valid.product_id.clone(),
            supplier_id: valid.supplier_id.clone(),
            quantity: valid.quantity,
            unit_cost: valid.unit_cost,
            total: valid.total,
            unit_type: valid.resolved_unit_type(&target),
            cash: valid.cash,
            transfer: valid.transfer,
            created_at: Utc::now(),
        };

        insert_in(&mut tx, &purchase).await?;
        product::adjust_stock_in(&mut tx, &target.id, purchase.quantity).await?;
        reprice_in(&mut tx, valid, &target).await?;

        tx.commit().await?;

        info!(
            id = %purchase.id,
            product_id = %purchase.product_id,
            quantity = %purchase.quantity,
            total = %purchase.total,
            "Purchase recorded"
        );

        self.require_view(&purchase.id).await
    }

    /// Replaces a purchase, moving stock between products when the product
    /// changed.
    pub async fn update(&self, id: &str, valid: &ValidPurchase) -> DbResult<PurchaseView> {
        let mut tx = self.pool.begin().await?;

        let old = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(entity::PURCHASE, id))?;
        let target = product::require_in(&mut tx, &valid.product_id).await?;
        require_supplier_in(&mut tx, &valid.supplier_id).await?;

        if old.product_id == target.id {
            let delta = valid.quantity - old.quantity;
            product::adjust_stock_in(&mut tx, &target.id, delta).await?;
        } else {
            reverse_stock_in(&mut tx, &old).await?;
            product::adjust_stock_in(&mut tx, &target.id, valid.quantity).await?;
        }
        reprice_in(&mut tx, valid, &target).await?;

        sqlx::query(
            r#"
            UPDATE purchases SET
                product_id = ?2,
                supplier_id = ?3,
                quantity = ?4,
                unit_cost_cents = ?5,
                total_cents = ?6,
                unit_type = ?7,
                cash_cents = ?8,
                transfer_cents = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&valid.product_id)
        .bind(&valid.supplier_id)
        .bind(valid.quantity.value().to_string())
        .bind(valid.unit_cost.cents())
        .bind(valid.total.cents())
        .bind(valid.resolved_unit_type(&target))
        .bind(valid.cash.cents())
        .bind(valid.transfer.cents())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %id,
            old_product_id = %old.product_id,
            product_id = %valid.product_id,
            quantity = %valid.quantity,
            "Purchase updated"
        );

        self.require_view(id).await
    }

    /// Deletes a purchase and takes its quantity back out of stock.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let old = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(entity::PURCHASE, id))?;

        sqlx::query("DELETE FROM purchases WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        reverse_stock_in(&mut tx, &old).await?;

        tx.commit().await?;

        info!(id = %id, product_id = %old.product_id, quantity = %old.quantity, "Purchase deleted");
        Ok(())
    }

    /// Gets one purchase with product and supplier names.
    pub async fn get(&self, id: &str) -> DbResult<Option<PurchaseView>> {
        let row: Option<PurchaseViewRow> = sqlx::query_as(&format!("{VIEW_SELECT} WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PurchaseView::try_from).transpose()
    }

    /// Lists purchases newest first, optionally within a window.
    pub async fn list(&self, window: Option<DateRange>) -> DbResult<Vec<PurchaseView>> {
        debug!(window = ?window, "Listing purchases");

        let rows: Vec<PurchaseViewRow> = match window {
            Some(range) => {
                sqlx::query_as(&format!(
                    "{VIEW_SELECT} \
                     WHERE julianday(p.created_at) >= julianday(?1) \
                       AND julianday(p.created_at) < julianday(?2) \
                     ORDER BY julianday(p.created_at) DESC, p.rowid DESC"
                ))
                .bind(range.start)
                .bind(range.end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!("{VIEW_SELECT} ORDER BY julianday(p.created_at) DESC, p.rowid DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(PurchaseView::try_from).collect()
    }

    /// Bare purchase rows within a window, oldest first.
    pub async fn list_between(&self, range: DateRange) -> DbResult<Vec<Purchase>> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, supplier_id, quantity, unit_cost_cents, total_cents,
                   unit_type, cash_cents, transfer_cents, created_at
            FROM purchases
            WHERE julianday(created_at) >= julianday(?1)
              AND julianday(created_at) < julianday(?2)
            ORDER BY julianday(created_at)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Purchase::try_from).collect()
    }

    async fn require_view(&self, id: &str) -> DbResult<PurchaseView> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found(entity::PURCHASE, id))
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
    let row: Option<PurchaseRow> = sqlx::query_as(
        r#"
        SELECT id, product_id, supplier_id, quantity, unit_cost_cents, total_cents,
               unit_type, cash_cents, transfer_cents, created_at
        FROM purchases WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(Purchase::try_from).transpose()
}

async fn insert_in(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
    debug!(id = %purchase.id, "Inserting purchase");

    sqlx::query(
        r#"
        INSERT INTO purchases (
            id, product_id, supplier_id, quantity, unit_cost_cents, total_cents,
            unit_type, cash_cents, transfer_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.product_id)
    .bind(&purchase.supplier_id)
    .bind(purchase.quantity.value().to_string())
    .bind(purchase.unit_cost.cents())
    .bind(purchase.total.cents())
    .bind(purchase.unit_type)
    .bind(purchase.cash.cents())
    .bind(purchase.transfer.cents())
    .bind(purchase.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn require_supplier_in(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    supplier::fetch_in(conn, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| DbError::not_found(entity::SUPPLIER, id))
}

/// Sets cost, derived sale price and unit type from a purchase.
async fn reprice_in(conn: &mut SqliteConnection, valid: &ValidPurchase, target: &Product) -> DbResult<()> {
    product::set_purchase_pricing_in(
        conn,
        &target.id,
        valid.unit_cost,
        valid.derived_sale_price(target),
        valid.resolved_unit_type(target),
    )
    .await
}

/// Takes a recorded purchase's quantity back out of its product.
async fn reverse_stock_in(conn: &mut SqliteConnection, old: &Purchase) -> DbResult<()> {
    match product::adjust_stock_in(conn, &old.product_id, -old.quantity).await {
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found(entity::PRODUCT) => {
            warn!(purchase_id = %old.id, product_id = %old.product_id, "Product gone, stock not reversed");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rust_decimal_macros::dec;
    use till_core::{IncrementRule, IncrementType, ProductInput, PurchaseInput, SupplierInput};

    struct Fixture {
        db: Database,
        product: Product,
        supplier_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = ProductInput {
            name: "Flour 1kg".to_string(),
            purchase_price: Money::from_cents(800),
            increment_type: IncrementType::Percentage,
            increment_value: dec!(20),
            ..Default::default()
        }
        .into_product();
        db.products().insert(&product).await.unwrap();
        let supplier = db
            .suppliers()
            .create(&SupplierInput { name: "Mill Co".to_string(), ..Default::default() })
            .await
            .unwrap();
        Fixture { db, product, supplier_id: supplier.id }
    }

    fn input(f: &Fixture, product_id: &str, quantity: Quantity, cost_cents: i64) -> ValidPurchase {
        PurchaseInput {
            product_id: Some(product_id.to_string()),
            supplier_id: Some(f.supplier_id.clone()),
            quantity: Some(quantity),
            unit_cost: Some(Money::from_cents(cost_cents)),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> Quantity {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_create_applies_stock_and_price() {
        let f = fixture().await;
        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();

        assert_eq!(view.purchase.total.cents(), 5000);
        assert_eq!(view.product_name.as_deref(), Some("Flour 1kg"));
        assert_eq!(view.supplier_name.as_deref(), Some("Mill Co"));

        let product = f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, Quantity::from_units(5));
        assert_eq!(product.purchase_price.cents(), 1000);
        assert_eq!(product.sale_price.cents(), 1200);
    }

    #[tokio::test]
    async fn test_create_with_override_and_unit_type() {
        let f = fixture().await;
        let mut valid = input(&f, &f.product.id, Quantity::new(dec!(2.5)), 399);
        valid.increment_override = Some(IncrementRule::fixed(dec!(1)));
        valid.unit_type = Some(UnitType::Kg);

        let view = f.db.purchases().create(&valid).await.unwrap();
        assert_eq!(view.purchase.total.cents(), 998);
        assert_eq!(view.purchase.unit_type, UnitType::Kg);

        let product = f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap();
        assert_eq!(product.sale_price.cents(), 499);
        assert_eq!(product.unit_type, UnitType::Kg);
        assert_eq!(product.stock, Quantity::new(dec!(2.5)));
        // stored rule untouched
        assert_eq!(product.increment_type, IncrementType::Percentage);
    }

    #[tokio::test]
    async fn test_create_unknown_references() {
        let f = fixture().await;
        let err = f
            .db
            .purchases()
            .create(&input(&f, "missing", Quantity::from_units(1), 100))
            .await
            .unwrap_err();
        assert!(err.is_not_found(entity::PRODUCT));

        let mut valid = input(&f, &f.product.id, Quantity::from_units(1), 100);
        valid.supplier_id = "missing".to_string();
        let err = f.db.purchases().create(&valid).await.unwrap_err();
        assert!(err.is_not_found(entity::SUPPLIER));

        // nothing applied
        assert!(stock_of(&f.db, &f.product.id).await.is_zero());
        assert!(f.db.purchases().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_same_product_moves_delta() {
        let f = fixture().await;
        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();

        f.db
            .purchases()
            .update(&view.purchase.id, &input(&f, &f.product.id, Quantity::from_units(3), 1000))
            .await
            .unwrap();

        assert_eq!(stock_of(&f.db, &f.product.id).await, Quantity::from_units(3));
    }

    #[tokio::test]
    async fn test_update_to_other_product() {
        let f = fixture().await;
        let other = ProductInput { name: "Sugar".to_string(), ..Default::default() }.into_product();
        f.db.products().insert(&other).await.unwrap();

        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();
        let updated = f
            .db
            .purchases()
            .update(&view.purchase.id, &input(&f, &other.id, Quantity::from_units(4), 200))
            .await
            .unwrap();

        assert_eq!(updated.product_name.as_deref(), Some("Sugar"));
        assert!(stock_of(&f.db, &f.product.id).await.is_zero());
        assert_eq!(stock_of(&f.db, &other.id).await, Quantity::from_units(4));

        let sugar = f.db.products().get_by_id(&other.id).await.unwrap().unwrap();
        assert_eq!(sugar.purchase_price.cents(), 200);
    }

    #[tokio::test]
    async fn test_update_rolls_back_on_missing_product() {
        let f = fixture().await;
        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();

        let err = f
            .db
            .purchases()
            .update(&view.purchase.id, &input(&f, "missing", Quantity::from_units(4), 200))
            .await
            .unwrap_err();
        assert!(err.is_not_found(entity::PRODUCT));
        assert_eq!(stock_of(&f.db, &f.product.id).await, Quantity::from_units(5));

        let err = f
            .db
            .purchases()
            .update("missing", &input(&f, &f.product.id, Quantity::from_units(1), 100))
            .await
            .unwrap_err();
        assert!(err.is_not_found(entity::PURCHASE));
    }

    #[tokio::test]
    async fn test_cross_product_update_failing_on_row_write_restores_old_stock() {
        let f = fixture().await;
        let other = ProductInput { name: "Sugar".to_string(), ..Default::default() }.into_product();
        f.db.products().insert(&other).await.unwrap();
        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();

        // Stock moves and repricing succeed, then the purchase row write aborts.
        sqlx::query(
            "CREATE TRIGGER block_purchase_update BEFORE UPDATE ON purchases \
             BEGIN SELECT RAISE(ABORT, 'purchase row locked'); END",
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let result = f
            .db
            .purchases()
            .update(&view.purchase.id, &input(&f, &other.id, Quantity::from_units(4), 200))
            .await;
        assert!(result.is_err());

        assert_eq!(stock_of(&f.db, &f.product.id).await, Quantity::from_units(5));
        assert!(stock_of(&f.db, &other.id).await.is_zero());
        let sugar = f.db.products().get_by_id(&other.id).await.unwrap().unwrap();
        assert_eq!(sugar.purchase_price, other.purchase_price);
        let stored = f.db.purchases().get(&view.purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.purchase.product_id, f.product.id);
    }

    #[tokio::test]
    async fn test_cross_product_update_failing_on_target_stock_restores_old_stock() {
        let f = fixture().await;
        let other = ProductInput { name: "Sugar".to_string(), ..Default::default() }.into_product();
        f.db.products().insert(&other).await.unwrap();
        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();

        // Adding anything to the target's stock overflows after the old
        // product was already reversed.
        sqlx::query("UPDATE products SET stock = ?2 WHERE id = ?1")
            .bind(&other.id)
            .bind(rust_decimal::Decimal::MAX.to_string())
            .execute(f.db.pool())
            .await
            .unwrap();

        let err = f
            .db
            .purchases()
            .update(&view.purchase.id, &input(&f, &other.id, Quantity::from_units(4), 200))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(_)));
        assert_eq!(stock_of(&f.db, &f.product.id).await, Quantity::from_units(5));
    }

    #[tokio::test]
    async fn test_delete_reverses_quantity_and_keeps_prices() {
        let f = fixture().await;
        let first = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(5), 1000))
            .await
            .unwrap();
        f.db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::new(dec!(1.5)), 1100))
            .await
            .unwrap();

        f.db.purchases().delete(&first.purchase.id).await.unwrap();

        let product = f.db.products().get_by_id(&f.product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, Quantity::new(dec!(1.5)));
        assert_eq!(product.purchase_price.cents(), 1100);

        let err = f.db.purchases().delete(&first.purchase.id).await.unwrap_err();
        assert!(err.is_not_found(entity::PURCHASE));
    }

    #[tokio::test]
    async fn test_deleted_product_leaves_dangling_purchase() {
        let f = fixture().await;
        let view = f
            .db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(2), 100))
            .await
            .unwrap();
        f.db.products().delete(&f.product.id).await.unwrap();

        let listed = f.db.purchases().list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_name, None);

        f.db.purchases().delete(&view.purchase.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_window() {
        let f = fixture().await;
        f.db
            .purchases()
            .create(&input(&f, &f.product.id, Quantity::from_units(1), 100))
            .await
            .unwrap();

        let now = Utc::now();
        let current = DateRange::new(now - chrono::Duration::days(1), now + chrono::Duration::days(1));
        assert_eq!(f.db.purchases().list(Some(current)).await.unwrap().len(), 1);
        assert_eq!(f.db.purchases().list_between(current).await.unwrap().len(), 1);

        let past = DateRange::calendar_year(2001).unwrap();
        assert!(f.db.purchases().list(Some(past)).await.unwrap().is_empty());
    }
}
