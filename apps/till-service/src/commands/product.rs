//! # Product Commands
//!
//! Catalog search and CRUD.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Search Flow                                  │
//! │                                                                         │
//! │  User types or scans "7790001"                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Looks like a barcode? (8-13 digits)      │                         │
//! │  │  YES: exact barcode lookup first          │──► Found? Return [1]    │
//! │  │  NO:  LIKE match over name and barcode    │                         │
//! │  └───────────────────────────────────────────┘                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<Product>, exact barcode hits first, then by name                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use till_core::validation::{self, validate_search_query};
use till_core::{CoreError, Money, Product, ProductInput, UnitType};

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Upper bound on search results.
pub const MAX_SEARCH_LIMIT: u32 = 100;

/// Checks if a query looks like a scanned barcode (EAN-8 to EAN-13).
fn is_barcode_query(query: &str) -> bool {
    let len = query.len();
    (8..=13).contains(&len) && query.chars().all(|c| c.is_ascii_digit())
}

/// Searches the catalog by name or barcode.
///
/// ## Arguments
/// * `query` - Search term; empty lists the catalog by name
/// * `limit` - Maximum results (default 20, max 100)
pub async fn search_products(db: &DbState, query: String, limit: Option<u32>) -> Result<Vec<Product>, ApiError> {
    let start = Instant::now();
    let query = validate_search_query(&query).map_err(CoreError::from)?;
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

    debug!(query = %query, limit = limit, "search_products command");

    // Scanners type the full code at once; an exact hit skips the LIKE scan.
    if is_barcode_query(&query) {
        if let Some(product) = db.inner().products().get_by_barcode(&query).await? {
            debug!(barcode = %query, "Barcode hit");
            return Ok(vec![product]);
        }
    }

    let products = db.inner().products().search(&query, limit).await?;

    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = products.len(),
        query = %query,
        "search_products complete"
    );
    Ok(products)
}

/// Adds a product to the catalog.
///
/// The sale price is derived from the purchase price and increment rule
/// unless one is given.
pub async fn add_product(db: &DbState, input: ProductInput) -> Result<Product, ApiError> {
    debug!(name = %input.name, "add_product command");
    let product = input.validate()?.into_product();
    Ok(db.inner().products().insert(&product).await?)
}

/// Replaces a product's editable fields.
///
/// Changing the increment fields here does not reprice the product; the
/// next purchase (or [`set_sale_price`]) does.
pub async fn update_product(db: &DbState, id: String, input: ProductInput) -> Result<Product, ApiError> {
    debug!(id = %id, "update_product command");
    let input = input.validate()?;

    let mut product = get_product(db, id).await?;
    input.apply_to(&mut product);
    db.inner().products().update(&product).await?;

    Ok(product)
}

/// Gets a product by its id.
pub async fn get_product(db: &DbState, id: String) -> Result<Product, ApiError> {
    db.inner()
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id).into())
}

/// The whole catalog, newest first.
pub async fn list_products(db: &DbState) -> Result<Vec<Product>, ApiError> {
    Ok(db.inner().products().list().await?)
}

/// Removes a product. Purchases that reference it are kept.
pub async fn delete_product(db: &DbState, id: String) -> Result<(), ApiError> {
    debug!(id = %id, "delete_product command");
    Ok(db.inner().products().delete(&id).await?)
}

/// Sets the sale price by hand, bypassing the increment rule.
pub async fn set_sale_price(db: &DbState, id: String, price: Money, unit_type: UnitType) -> Result<Product, ApiError> {
    debug!(id = %id, price = %price, "set_sale_price command");
    validation::validate_non_negative_amount("sale_price", price).map_err(CoreError::from)?;
    Ok(db.inner().products().set_sale_price(&id, price, unit_type).await?)
}
