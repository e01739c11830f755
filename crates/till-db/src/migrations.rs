//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the crate and
//! applied by [`run_migrations`] every time a [`crate::Database`] opens.
//!
//! Column conventions the repositories rely on:
//! - money is INTEGER cents in `*_cents` columns
//! - `stock`, `quantity` and `increment_value` are TEXT decimals, parsed with
//!   `rust_decimal` on read
//! - `cashbox_sessions.snapshot` is the session serialized as JSON
//! - `idx_cashbox_single_open` is the store-side guard for "one open session"
//!
//! A schema change is a new `NNN_*.sql` file; applied files are checksummed
//! by sqlx and must not be edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration the store hasn't seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;

    let (embedded, applied) = migration_status(pool).await?;
    info!(embedded, applied, "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_every_embedded_migration_is_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert!(embedded >= 1);
        assert_eq!(embedded, applied);
    }

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();
        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(embedded, applied);
    }

    #[tokio::test]
    async fn test_decimal_columns_keep_exact_text() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO products (id, name, stock, created_at, updated_at) \
             VALUES ('p-1', 'Ham', '0.125', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let stock: String = sqlx::query_scalar("SELECT stock FROM products WHERE id = 'p-1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(stock, "0.125");
    }
}
