//! # Supplier Repository
//!
//! Database operations for the supplier registry.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{entity, DbError, DbResult};
use till_core::{Supplier, SupplierInput};

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Inserts a supplier from a validated input.
    pub async fn create(&self, input: &SupplierInput) -> DbResult<Supplier> {
        let supplier = Supplier {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.clone(),
            contact: input.contact.clone(),
            address: input.address.clone(),
            info: input.info.clone(),
            created_at: Utc::now(),
        };

        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact, address, info, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact)
        .bind(&supplier.address)
        .bind(&supplier.info)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Replaces the editable fields of an existing supplier.
    pub async fn update(&self, id: &str, input: &SupplierInput) -> DbResult<Supplier> {
        debug!(id = %id, "Updating supplier");

        let result = sqlx::query(
            "UPDATE suppliers SET name = ?2, contact = ?3, address = ?4, info = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.contact)
        .bind(&input.address)
        .bind(&input.info)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity::SUPPLIER, id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(entity::SUPPLIER, id))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// All suppliers, alphabetical.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, contact, address, info, created_at FROM suppliers ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    /// Deletes a supplier. Purchases that reference it are kept.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity::SUPPLIER, id));
        }
        Ok(())
    }
}

pub(crate) async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Supplier>> {
    let supplier = sqlx::query_as::<_, Supplier>(
        "SELECT id, name, contact, address, info, created_at FROM suppliers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(supplier)
}
