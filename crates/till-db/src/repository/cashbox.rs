//! # Cashbox Repository
//!
//! Durable copy of the cash-drawer session.
//!
//! The open session lives in memory in the service; this table holds its
//! latest snapshot (JSON) so a restart resumes it, and keeps every closed
//! session as history.
//!
//! ```text
//! open     INSERT  (closed_at NULL, snapshot)
//! mutate   UPDATE  snapshot                      ← same tx as the sale write
//! close    UPDATE  snapshot, closed_at, physical, expected, difference
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{entity, DbError, DbResult};
use till_core::{CashboxSession, ClosingRecord, Money};

#[derive(Debug, sqlx::FromRow)]
struct ClosingRow {
    id: String,
    snapshot: String,
    closed_at: DateTime<Utc>,
    physical_cash_cents: Option<i64>,
    expected_total_cents: Option<i64>,
    difference_cents: Option<i64>,
}

impl TryFrom<ClosingRow> for ClosingRecord {
    type Error = DbError;

    fn try_from(row: ClosingRow) -> DbResult<Self> {
        let cents = |field: &str, value: Option<i64>| {
            value
                .map(Money::from_cents)
                .ok_or_else(|| DbError::corrupt(field, format!("missing on closed session {}", row.id)))
        };

        Ok(ClosingRecord {
            physical_cash: cents("cashbox_sessions.physical_cash_cents", row.physical_cash_cents)?,
            expected_total: cents("cashbox_sessions.expected_total_cents", row.expected_total_cents)?,
            difference: cents("cashbox_sessions.difference_cents", row.difference_cents)?,
            session: serde_json::from_str(&row.snapshot)?,
            closed_at: row.closed_at,
        })
    }
}

/// Repository for cashbox sessions.
#[derive(Debug, Clone)]
pub struct CashboxRepository {
    pool: SqlitePool,
}

impl CashboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashboxRepository { pool }
    }

    /// The session left open, if any.
    pub async fn load_open(&self) -> DbResult<Option<CashboxSession>> {
        let snapshot: Option<String> =
            sqlx::query_scalar("SELECT snapshot FROM cashbox_sessions WHERE closed_at IS NULL LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match snapshot {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Stores a freshly opened session.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Another session is still open
    pub async fn insert_open(&self, session: &CashboxSession) -> DbResult<()> {
        debug!(id = %session.id, opening = %session.opening, "Inserting open session");

        sqlx::query("INSERT INTO cashbox_sessions (id, opened_at, snapshot) VALUES (?1, ?2, ?3)")
            .bind(&session.id)
            .bind(session.opened_at)
            .bind(serde_json::to_string(session)?)
            .execute(&self.pool)
            .await?;

        info!(id = %session.id, opening = %session.opening, "Cashbox session opened");
        Ok(())
    }

    /// Rewrites the open session's snapshot.
    pub async fn save_snapshot(&self, session: &CashboxSession) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        save_snapshot_in(&mut conn, session).await
    }

    /// Marks the session closed and stores the final figures.
    pub async fn close(&self, record: &ClosingRecord) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cashbox_sessions SET
                snapshot = ?2,
                closed_at = ?3,
                physical_cash_cents = ?4,
                expected_total_cents = ?5,
                difference_cents = ?6
            WHERE id = ?1 AND closed_at IS NULL
            "#,
        )
        .bind(&record.session.id)
        .bind(serde_json::to_string(&record.session)?)
        .bind(record.closed_at)
        .bind(record.physical_cash.cents())
        .bind(record.expected_total.cents())
        .bind(record.difference.cents())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity::CASHBOX_SESSION, &record.session.id));
        }

        info!(
            id = %record.session.id,
            expected = %record.expected_total,
            physical = %record.physical_cash,
            difference = %record.difference,
            "Cashbox session closed"
        );
        Ok(())
    }

    /// The most recent closing.
    pub async fn last_closing(&self) -> DbResult<Option<ClosingRecord>> {
        Ok(self.list_closings(1).await?.into_iter().next())
    }

    /// Closed sessions, most recent first.
    pub async fn list_closings(&self, limit: u32) -> DbResult<Vec<ClosingRecord>> {
        let rows: Vec<ClosingRow> = sqlx::query_as(
            r#"
            SELECT id, snapshot, closed_at, physical_cash_cents, expected_total_cents, difference_cents
            FROM cashbox_sessions
            WHERE closed_at IS NOT NULL
            ORDER BY julianday(closed_at) DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ClosingRecord::try_from).collect()
    }
}

/// Rewrites the open session's snapshot on the given connection.
pub(crate) async fn save_snapshot_in(conn: &mut SqliteConnection, session: &CashboxSession) -> DbResult<()> {
    debug!(id = %session.id, sales = session.sales.len(), "Saving session snapshot");

    let result = sqlx::query("UPDATE cashbox_sessions SET snapshot = ?2 WHERE id = ?1 AND closed_at IS NULL")
        .bind(&session.id)
        .bind(serde_json::to_string(session)?)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(entity::CASHBOX_SESSION, &session.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_open_snapshot_and_resume() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.cashbox().load_open().await.unwrap().is_none());

        let mut session = CashboxSession::new(Money::from_cents(10_000)).unwrap();
        db.cashbox().insert_open(&session).await.unwrap();

        session.record_income(Money::from_cents(2_000), "change float").unwrap();
        db.cashbox().save_snapshot(&session).await.unwrap();

        let resumed = db.cashbox().load_open().await.unwrap().unwrap();
        assert_eq!(resumed.id, session.id);
        assert_eq!(resumed.incomes.len(), 1);
        assert_eq!(resumed.totals.expected_total.cents(), 12_000);
    }

    #[tokio::test]
    async fn test_second_open_session_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = CashboxSession::new(Money::zero()).unwrap();
        let second = CashboxSession::new(Money::zero()).unwrap();

        db.cashbox().insert_open(&first).await.unwrap();
        let err = db.cashbox().insert_open(&second).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_close_and_history() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = CashboxSession::new(Money::from_cents(15_000)).unwrap();
        db.cashbox().insert_open(&first).await.unwrap();
        let record = first.close(Money::from_cents(14_000)).unwrap();
        db.cashbox().close(&record).await.unwrap();

        assert!(db.cashbox().load_open().await.unwrap().is_none());
        assert!(db.cashbox().close(&record).await.unwrap_err().is_not_found(entity::CASHBOX_SESSION));

        let second = CashboxSession::new(Money::from_cents(5_000)).unwrap();
        db.cashbox().insert_open(&second).await.unwrap();
        db.cashbox().close(&second.close(Money::from_cents(5_000)).unwrap()).await.unwrap();

        let last = db.cashbox().last_closing().await.unwrap().unwrap();
        assert!(last.difference.is_zero());

        let history = db.cashbox().list_closings(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].difference.cents(), -1_000);
        assert_eq!(history[1].session.id, record.session.id);
    }

    #[tokio::test]
    async fn test_snapshot_requires_open_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = CashboxSession::new(Money::zero()).unwrap();
        let err = db.cashbox().save_snapshot(&session).await.unwrap_err();
        assert!(err.is_not_found(entity::CASHBOX_SESSION));
    }
}
