//! # Supplier Commands

use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use till_core::{CoreError, Supplier, SupplierInput};

/// Registers a supplier.
///
/// ## Returns
/// * `Err(MISSING_REQUIRED_FIELD)` - Blank name
/// * `Err(VALIDATION_ERROR)` - Contact not 7-20 digits, address or info too long
pub async fn add_supplier(db: &DbState, input: SupplierInput) -> Result<Supplier, ApiError> {
    debug!(name = %input.name, "add_supplier command");
    let input = input.validate()?;
    Ok(db.inner().suppliers().create(&input).await?)
}

pub async fn update_supplier(db: &DbState, id: String, input: SupplierInput) -> Result<Supplier, ApiError> {
    debug!(id = %id, "update_supplier command");
    let input = input.validate()?;
    Ok(db.inner().suppliers().update(&id, &input).await?)
}

/// All suppliers, alphabetical.
pub async fn list_suppliers(db: &DbState) -> Result<Vec<Supplier>, ApiError> {
    Ok(db.inner().suppliers().list().await?)
}

pub async fn get_supplier(db: &DbState, id: String) -> Result<Supplier, ApiError> {
    db.inner()
        .suppliers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::SupplierNotFound(id).into())
}

/// Removes a supplier. Purchases that reference it keep the dangling id.
pub async fn delete_supplier(db: &DbState, id: String) -> Result<(), ApiError> {
    debug!(id = %id, "delete_supplier command");
    Ok(db.inner().suppliers().delete(&id).await?)
}
