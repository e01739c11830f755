//! # Purchase Commands
//!
//! Stock arriving from suppliers. Each write validates first, then hands
//! the store one transaction that moves stock and reprices the product.

use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use till_core::{CoreError, PurchaseFilter, PurchaseInput, PurchaseView};

/// Records a purchase, adds its quantity to stock and reprices the product.
///
/// ## Returns
/// * `Err(MISSING_REQUIRED_FIELD)` - Product, supplier, quantity or cost absent
/// * `Err(INVALID_AMOUNT)` - Non-positive quantity or cost, negative payment
/// * `Err(PRODUCT_NOT_FOUND)` / `Err(SUPPLIER_NOT_FOUND)` - Unknown reference
pub async fn create_purchase(db: &DbState, input: PurchaseInput) -> Result<PurchaseView, ApiError> {
    debug!(product_id = ?input.product_id, supplier_id = ?input.supplier_id, "create_purchase command");
    let valid = input.validate()?;
    Ok(db.inner().purchases().create(&valid).await?)
}

/// Rewrites a purchase and moves stock by the difference, across products
/// when the product changed.
pub async fn update_purchase(db: &DbState, id: String, input: PurchaseInput) -> Result<PurchaseView, ApiError> {
    debug!(id = %id, "update_purchase command");
    let valid = input.validate()?;
    Ok(db.inner().purchases().update(&id, &valid).await?)
}

/// Deletes a purchase and takes its quantity back out of stock. Prices stay.
pub async fn delete_purchase(db: &DbState, id: String) -> Result<(), ApiError> {
    debug!(id = %id, "delete_purchase command");
    Ok(db.inner().purchases().delete(&id).await?)
}

pub async fn get_purchase(db: &DbState, id: String) -> Result<PurchaseView, ApiError> {
    db.inner()
        .purchases()
        .get(&id)
        .await?
        .ok_or_else(|| CoreError::PurchaseNotFound(id).into())
}

/// Purchases newest first, optionally limited to a year or a month of it.
pub async fn list_purchases(db: &DbState, filter: PurchaseFilter) -> Result<Vec<PurchaseView>, ApiError> {
    debug!(year = ?filter.year, month = ?filter.month, "list_purchases command");
    let window = filter.window()?;
    Ok(db.inner().purchases().list(window).await?)
}
