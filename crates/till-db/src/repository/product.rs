//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - CRUD operations
//! - Name / barcode search
//! - Stock moves and purchase pricing (called inside purchase and sale
//!   transactions through the `*_in` functions)
//!
//! ## Stock Is Exact Text
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock = '12.750'   (TEXT, never REAL)                         │
//! │                                                                         │
//! │  adjust_stock_in(conn, id, -0.250)                                      │
//! │     1. SELECT stock          → Decimal 12.750                           │
//! │     2. 12.750 + (-0.250)     → Decimal 12.500   (exact, in Rust)        │
//! │     3. UPDATE stock = '12.500'                                          │
//! │                                                                         │
//! │  Always called on a transaction's connection, so the read and the      │
//! │  write see the same row.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{entity, DbError, DbResult};
use crate::repository::{contains_pattern, parse_decimal, parse_quantity};
use till_core::{CoreError, IncrementType, Money, Product, Quantity, UnitType};

const PRODUCT_COLUMNS: &str = "id, barcode, name, description, purchase_price_cents, \
     increment_type, increment_value, sale_price_cents, stock, unit_type, created_at, updated_at";

/// Raw `products` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    barcode: Option<String>,
    name: String,
    description: Option<String>,
    purchase_price_cents: i64,
    increment_type: String,
    increment_value: String,
    sale_price_cents: i64,
    stock: String,
    unit_type: UnitType,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            increment_value: parse_decimal("products.increment_value", &row.increment_value)?,
            stock: parse_quantity("products.stock", &row.stock)?,
            increment_type: IncrementType::from_stored(&row.increment_type),
            purchase_price: Money::from_cents(row.purchase_price_cents),
            sale_price: Money::from_cents(row.sale_price_cents),
            id: row.id,
            barcode: row.barcode,
            name: row.name,
            description: row.description,
            unit_type: row.unit_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let results = repo.search("flour", 20).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches products by name or barcode (substring, case-insensitive
    /// for ASCII).
    ///
    /// An exact barcode hit sorts first so a scanner lookup lands on the
    /// scanned product.
    ///
    /// ## Arguments
    /// * `query` - Search term (can be partial)
    /// * `limit` - Maximum results to return
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            let rows: Vec<ProductRow> = sqlx::query_as(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1"
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            return into_products(rows);
        }

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name LIKE ?1 ESCAPE '\\' OR barcode LIKE ?1 ESCAPE '\\' \
             ORDER BY (barcode = ?2) DESC, name \
             LIMIT ?3"
        ))
        .bind(contains_pattern(query))
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let products = into_products(rows)?;
        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists the whole catalog, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        into_products(rows)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// Gets a product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 LIMIT 1"
        ))
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand)
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, barcode, name, description,
                purchase_price_cents, increment_type, increment_value, sale_price_cents,
                stock, unit_type, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.purchase_price.cents())
        .bind(product.increment_type.as_str())
        .bind(product.increment_value.to_string())
        .bind(product.sale_price.cents())
        .bind(product.stock.value().to_string())
        .bind(product.unit_type)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates every editable field of an existing product.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                barcode = ?2,
                name = ?3,
                description = ?4,
                purchase_price_cents = ?5,
                increment_type = ?6,
                increment_value = ?7,
                sale_price_cents = ?8,
                stock = ?9,
                unit_type = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.purchase_price.cents())
        .bind(product.increment_type.as_str())
        .bind(product.increment_value.to_string())
        .bind(product.sale_price.cents())
        .bind(product.stock.value().to_string())
        .bind(product.unit_type)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity::PRODUCT, &product.id));
        }

        Ok(())
    }

    /// Deletes a product. Purchases that reference it are kept.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity::PRODUCT, id));
        }

        Ok(())
    }

    /// Manually overrides the sale price and unit type.
    ///
    /// The increment rule is untouched; the next purchase re-derives the
    /// price from it.
    pub async fn set_sale_price(&self, id: &str, sale_price: Money, unit_type: UnitType) -> DbResult<Product> {
        debug!(id = %id, sale_price = %sale_price, unit_type = %unit_type, "Setting sale price");

        let result = sqlx::query(
            "UPDATE products SET sale_price_cents = ?2, unit_type = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(sale_price.cents())
        .bind(unit_type)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity::PRODUCT, id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(entity::PRODUCT, id))
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

/// Reads a product on the given connection.
pub(crate) async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(Product::try_from).transpose()
}

/// Like [`fetch_in`] but a missing product is an error.
pub(crate) async fn require_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    fetch_in(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found(entity::PRODUCT, id))
}

/// Adds `delta` (possibly negative) to a product's stock.
///
/// Stock may go below zero.
pub(crate) async fn adjust_stock_in(conn: &mut SqliteConnection, id: &str, delta: Quantity) -> DbResult<Quantity> {
    let product = require_in(conn, id).await?;
    let stock = product
        .stock
        .checked_add(delta)
        .ok_or_else(|| CoreError::invalid_amount("stock", "stock level is out of range"))?;

    debug!(id = %id, delta = %delta, stock = %stock, "Adjusting stock");

    sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(stock.value().to_string())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(stock)
}

/// Writes the price fields a committed purchase sets on its product.
pub(crate) async fn set_purchase_pricing_in(
    conn: &mut SqliteConnection,
    id: &str,
    purchase_price: Money,
    sale_price: Money,
    unit_type: UnitType,
) -> DbResult<()> {
    debug!(id = %id, purchase_price = %purchase_price, sale_price = %sale_price, "Repricing product");

    sqlx::query(
        r#"
        UPDATE products SET
            purchase_price_cents = ?2,
            sale_price_cents = ?3,
            unit_type = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(purchase_price.cents())
    .bind(sale_price.cents())
    .bind(unit_type)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
