//! # Cashbox Module
//!
//! The cash-drawer session: what went into and out of the drawer between
//! opening and closing, and what should be in it right now.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Cashbox (slot)      open(opening)                                     │
//! │   ┌──────────┐  ──────────────────────►  ┌────────────────────────┐    │
//! │   │  empty   │                           │   CashboxSession        │    │
//! │   └──────────┘  ◄──────────────────────  │   sales / incomes /     │    │
//! │        ▲          close(physical_cash)   │   expenses + totals     │    │
//! │        │                 │               └───────────┬────────────┘    │
//! │        │                 ▼                           │                  │
//! │        │         ClosingRecord                       │ record_sale      │
//! │        │         (frozen session,                    │ record_income    │
//! │        │          expected, difference)              │ record_expense   │
//! │        │                                             │ set_sale_canceled│
//! │        └─────────────────────────────────────────────┘                  │
//! │                                                                         │
//! │  expected_total = opening + cash sales + incomes − expenses            │
//! │  Totals are re-folded from the lists after EVERY mutation.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Atomicity
//! Every mutating method validates before touching the session, so an `Err`
//! leaves the slot exactly as it was. A change whose totals would leave the
//! i64 cent range is undone and reported as `InvalidAmount`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CashEntry, Sale};
use crate::validation;

// =============================================================================
// Session Totals
// =============================================================================

/// Running totals derived from a session's lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionTotals {
    /// Σ amount over non-canceled sales.
    pub sales_total: Money,
    /// Σ cash over non-canceled sales.
    pub cash_sales_total: Money,
    /// Σ transfer over non-canceled sales.
    pub transfer_sales_total: Money,
    pub incomes_total: Money,
    pub expenses_total: Money,
    /// What the drawer should hold.
    pub expected_total: Money,
}

impl SessionTotals {
    /// Folds the totals from scratch.
    ///
    /// ## Returns
    /// * `Err(InvalidAmount)` - A total leaves the i64 cent range
    pub fn compute(opening: Money, sales: &[Sale], incomes: &[CashEntry], expenses: &[CashEntry]) -> CoreResult<Self> {
        let active = || sales.iter().filter(|s| s.is_active());

        let sales_total = fold("sales_total", active().map(|s| s.amount))?;
        let cash_sales_total = fold("cash_sales_total", active().map(|s| s.cash))?;
        let transfer_sales_total = fold("transfer_sales_total", active().map(|s| s.transfer))?;
        let incomes_total = fold("incomes_total", incomes.iter().map(|e| e.amount))?;
        let expenses_total = fold("expenses_total", expenses.iter().map(|e| e.amount))?;

        let expected_total = opening
            .checked_add(cash_sales_total)
            .and_then(|m| m.checked_add(incomes_total))
            .and_then(|m| m.checked_sub(expenses_total))
            .ok_or_else(|| out_of_range("expected_total"))?;

        Ok(SessionTotals {
            sales_total,
            cash_sales_total,
            transfer_sales_total,
            incomes_total,
            expenses_total,
            expected_total,
        })
    }
}

fn fold(field: &str, amounts: impl Iterator<Item = Money>) -> CoreResult<Money> {
    Money::checked_sum(amounts).ok_or_else(|| out_of_range(field))
}

fn out_of_range(field: &str) -> CoreError {
    CoreError::invalid_amount(field, "total is out of range")
}

// =============================================================================
// Cashbox Session
// =============================================================================

/// An open cash-drawer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashboxSession {
    pub id: String,
    /// Cash counted into the drawer at opening.
    pub opening: Money,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    /// In recording order.
    pub sales: Vec<Sale>,
    pub incomes: Vec<CashEntry>,
    pub expenses: Vec<CashEntry>,
    pub totals: SessionTotals,
}

impl CashboxSession {
    /// Starts a session with empty lists.
    ///
    /// ## Returns
    /// * `Ok(CashboxSession)` - `expected_total == opening`
    /// * `Err(InvalidAmount)` - `opening` is negative
    pub fn new(opening: Money) -> CoreResult<Self> {
        validation::validate_non_negative_amount("opening", opening)?;

        let mut session = CashboxSession {
            id: uuid::Uuid::new_v4().to_string(),
            opening,
            opened_at: Utc::now(),
            sales: Vec::new(),
            incomes: Vec::new(),
            expenses: Vec::new(),
            totals: SessionTotals::default(),
        };
        session.recalculate()?;
        Ok(session)
    }

    /// Re-folds every total from the lists. On `Err` the stored totals are
    /// left as they were.
    pub fn recalculate(&mut self) -> CoreResult<()> {
        self.totals = SessionTotals::compute(self.opening, &self.sales, &self.incomes, &self.expenses)?;
        Ok(())
    }

    #[inline]
    pub fn expected_total(&self) -> Money {
        self.totals.expected_total
    }

    pub fn find_sale(&self, sale_id: &str) -> Option<&Sale> {
        self.sales.iter().find(|s| s.id == sale_id)
    }

    /// Appends a sale. A sale whose id is already present replaces the
    /// earlier entry in place.
    pub fn record_sale(&mut self, sale: Sale) -> CoreResult<()> {
        let mut sales = self.sales.clone();
        match sales.iter_mut().find(|s| s.id == sale.id) {
            Some(existing) => *existing = sale,
            None => sales.push(sale),
        }
        self.totals = SessionTotals::compute(self.opening, &sales, &self.incomes, &self.expenses)?;
        self.sales = sales;
        Ok(())
    }

    /// Records money put into the drawer outside of a sale.
    pub fn record_income(&mut self, amount: Money, description: &str) -> CoreResult<CashEntry> {
        validation::validate_positive_amount("amount", amount)?;
        let entry = CashEntry::new(amount, description.trim());
        self.incomes.push(entry.clone());
        if let Err(err) = self.recalculate() {
            self.incomes.pop();
            return Err(err);
        }
        Ok(entry)
    }

    /// Records money taken out of the drawer.
    pub fn record_expense(&mut self, amount: Money, description: &str) -> CoreResult<CashEntry> {
        validation::validate_positive_amount("amount", amount)?;
        let entry = CashEntry::new(amount, description.trim());
        self.expenses.push(entry.clone());
        if let Err(err) = self.recalculate() {
            self.expenses.pop();
            return Err(err);
        }
        Ok(entry)
    }

    /// Flips a sale's `canceled` flag. Setting the current value again is a
    /// no-op apart from the recompute.
    pub fn set_sale_canceled(&mut self, sale_id: &str, canceled: bool) -> CoreResult<()> {
        let sale = self
            .sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let previous = std::mem::replace(&mut sale.canceled, canceled);
        if let Err(err) = self.recalculate() {
            if let Some(sale) = self.sales.iter_mut().find(|s| s.id == sale_id) {
                sale.canceled = previous;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Freezes the session into a closing record.
    ///
    /// ## Returns
    /// * `Err(InvalidAmount)` - `difference` leaves the i64 cent range
    pub fn close(mut self, physical_cash: Money) -> CoreResult<ClosingRecord> {
        self.recalculate()?;
        let expected_total = self.totals.expected_total;
        let difference = physical_cash
            .checked_sub(expected_total)
            .ok_or_else(|| out_of_range("difference"))?;
        Ok(ClosingRecord {
            session: self,
            physical_cash,
            expected_total,
            difference,
            closed_at: Utc::now(),
        })
    }
}

// =============================================================================
// Closing Record
// =============================================================================

/// The immutable result of closing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClosingRecord {
    pub session: CashboxSession,
    /// Cash counted in the drawer at close.
    pub physical_cash: Money,
    pub expected_total: Money,
    /// `physical_cash − expected_total`. Negative means the drawer is short.
    pub difference: Money,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
}

// =============================================================================
// Cashbox (single active slot)
// =============================================================================

/// Holds at most one open session.
///
/// ## Usage
/// ```rust
/// use till_core::cashbox::Cashbox;
/// use till_core::money::Money;
///
/// let mut cashbox = Cashbox::new();
/// cashbox.open(Money::from_cents(15_000)).unwrap();
/// let closing = cashbox.close(Money::from_cents(15_000)).unwrap();
/// assert!(closing.difference.is_zero());
/// assert!(!cashbox.is_open());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cashbox {
    active: Option<CashboxSession>,
}

impl Cashbox {
    /// An empty slot.
    pub fn new() -> Self {
        Cashbox::default()
    }

    /// A slot restored from a persisted session.
    pub fn restore(active: Option<CashboxSession>) -> Self {
        Cashbox { active }
    }

    pub fn active(&self) -> Option<&CashboxSession> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    fn session_mut(&mut self) -> CoreResult<&mut CashboxSession> {
        self.active.as_mut().ok_or(CoreError::NoActiveSession)
    }

    /// Opens a new session.
    ///
    /// ## Returns
    /// * `Err(SessionAlreadyOpen)` - A session is open; it is left unchanged
    /// * `Err(InvalidAmount)` - `opening` is negative
    pub fn open(&mut self, opening: Money) -> CoreResult<&CashboxSession> {
        if let Some(current) = &self.active {
            return Err(CoreError::SessionAlreadyOpen {
                opened_at: current.opened_at,
            });
        }
        let session = CashboxSession::new(opening)?;
        Ok(self.active.insert(session))
    }

    pub fn record_sale(&mut self, sale: Sale) -> CoreResult<&CashboxSession> {
        let session = self.session_mut()?;
        session.record_sale(sale)?;
        Ok(session)
    }

    pub fn record_income(&mut self, amount: Money, description: &str) -> CoreResult<&CashboxSession> {
        let session = self.session_mut()?;
        session.record_income(amount, description)?;
        Ok(session)
    }

    pub fn record_expense(&mut self, amount: Money, description: &str) -> CoreResult<&CashboxSession> {
        let session = self.session_mut()?;
        session.record_expense(amount, description)?;
        Ok(session)
    }

    pub fn set_sale_canceled(&mut self, sale_id: &str, canceled: bool) -> CoreResult<&CashboxSession> {
        let session = self.session_mut()?;
        session.set_sale_canceled(sale_id, canceled)?;
        Ok(session)
    }

    /// Closes the open session and empties the slot. On `Err` the session
    /// stays open.
    pub fn close(&mut self, physical_cash: Money) -> CoreResult<ClosingRecord> {
        let session = self.active.as_ref().ok_or(CoreError::NoActiveSession)?;
        let closing = session.clone().close(physical_cash)?;
        self.active = None;
        Ok(closing)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn sale(amount: i64, cash: i64, transfer: i64) -> Sale {
        Sale::new("item", cents(amount), cents(cash), cents(transfer))
    }

    #[test]
    fn test_open_sets_expected_to_opening() {
        let mut cashbox = Cashbox::new();
        let session = cashbox.open(cents(10_000)).unwrap();
        assert_eq!(session.expected_total(), cents(10_000));
        assert!(session.sales.is_empty());
        assert_eq!(session.totals.sales_total, Money::zero());
    }

    #[test]
    fn test_open_rejects_negative_opening() {
        let mut cashbox = Cashbox::new();
        assert!(matches!(cashbox.open(cents(-1)), Err(CoreError::InvalidAmount { .. })));
        assert!(!cashbox.is_open());
    }

    #[test]
    fn test_second_open_keeps_existing_session() {
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(10_000)).unwrap();
        cashbox.record_income(cents(500), "float").unwrap();
        let before = cashbox.clone();

        let err = cashbox.open(cents(0)).unwrap_err();
        assert!(matches!(err, CoreError::SessionAlreadyOpen { .. }));
        assert_eq!(cashbox, before);
    }

    #[test]
    fn test_mutations_without_session() {
        let mut cashbox = Cashbox::new();
        assert_eq!(cashbox.record_sale(sale(100, 100, 0)).unwrap_err(), CoreError::NoActiveSession);
        assert_eq!(cashbox.record_income(cents(100), "x").unwrap_err(), CoreError::NoActiveSession);
        assert_eq!(cashbox.record_expense(cents(100), "x").unwrap_err(), CoreError::NoActiveSession);
        assert_eq!(cashbox.set_sale_canceled("nope", true).unwrap_err(), CoreError::NoActiveSession);
        assert_eq!(cashbox.close(cents(0)).unwrap_err(), CoreError::NoActiveSession);
        assert_eq!(cashbox, Cashbox::new());
    }

    #[test]
    fn test_income_and_expense_must_be_positive() {
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(1_000)).unwrap();
        assert!(matches!(cashbox.record_income(cents(0), "x"), Err(CoreError::InvalidAmount { .. })));
        assert!(matches!(cashbox.record_expense(cents(-5), "x"), Err(CoreError::InvalidAmount { .. })));

        let session = cashbox.active().unwrap();
        assert!(session.incomes.is_empty());
        assert!(session.expenses.is_empty());
        assert_eq!(session.expected_total(), cents(1_000));
    }

    #[test]
    fn test_full_day_reconciles() {
        // open 100 → sale 30 cash → income 20 → expense 5 → close 145
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(10_000)).unwrap();
        cashbox.record_sale(sale(3_000, 3_000, 0)).unwrap();
        cashbox.record_income(cents(2_000), "change float").unwrap();
        cashbox.record_expense(cents(500), "cleaning").unwrap();

        let closing = cashbox.close(cents(14_500)).unwrap();
        assert_eq!(closing.expected_total, cents(14_500));
        assert_eq!(closing.difference, Money::zero());
        assert!(!cashbox.is_open());
    }

    #[test]
    fn test_close_reports_shortfall() {
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(10_000)).unwrap();
        cashbox.record_sale(sale(5_000, 5_000, 0)).unwrap();

        let mut exact = cashbox.clone();
        assert_eq!(exact.close(cents(15_000)).unwrap().difference, Money::zero());
        assert_eq!(cashbox.close(cents(14_000)).unwrap().difference, cents(-1_000));
    }

    #[test]
    fn test_transfer_sales_do_not_touch_expected() {
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(1_000)).unwrap();
        let session = cashbox.record_sale(sale(2_000, 500, 1_500)).unwrap();

        assert_eq!(session.totals.sales_total, cents(2_000));
        assert_eq!(session.totals.cash_sales_total, cents(500));
        assert_eq!(session.totals.transfer_sales_total, cents(1_500));
        assert_eq!(session.expected_total(), cents(1_500));
    }

    #[test]
    fn test_cancel_and_reactivate_recompute() {
        let mut cashbox = Cashbox::new();
        cashbox.open(Money::zero()).unwrap();
        let first = sale(1_000, 1_000, 0);
        let first_id = first.id.clone();
        cashbox.record_sale(first).unwrap();
        cashbox.record_sale(sale(700, 200, 500)).unwrap();

        let session = cashbox.set_sale_canceled(&first_id, true).unwrap();
        assert_eq!(session.totals.cash_sales_total, cents(200));
        assert_eq!(session.totals.sales_total, cents(700));
        assert_eq!(session.sales.len(), 2);

        // idempotent
        let session = cashbox.set_sale_canceled(&first_id, true).unwrap();
        assert_eq!(session.totals.cash_sales_total, cents(200));

        let session = cashbox.set_sale_canceled(&first_id, false).unwrap();
        assert_eq!(session.totals.cash_sales_total, cents(1_200));
    }

    #[test]
    fn test_cancel_unknown_sale() {
        let mut cashbox = Cashbox::new();
        cashbox.open(Money::zero()).unwrap();
        assert_eq!(
            cashbox.set_sale_canceled("missing", true).unwrap_err(),
            CoreError::SaleNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_cash_total_matches_fold_after_any_sequence() {
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(500)).unwrap();

        let sales: Vec<Sale> = (1..=6).map(|i| sale(i * 100, i * 60, i * 40)).collect();
        for s in &sales {
            cashbox.record_sale(s.clone()).unwrap();
        }
        for (i, s) in sales.iter().enumerate() {
            cashbox.set_sale_canceled(&s.id, i % 2 == 0).unwrap();
        }
        cashbox.set_sale_canceled(&sales[0].id, false).unwrap();

        let session = cashbox.active().unwrap();
        let folded: Money = session.sales.iter().filter(|s| !s.canceled).map(|s| s.cash).sum();
        assert_eq!(session.totals.cash_sales_total, folded);
        assert_eq!(session.expected_total(), cents(500) + folded);
    }

    #[test]
    fn test_recording_same_sale_twice_replaces() {
        let mut cashbox = Cashbox::new();
        cashbox.open(Money::zero()).unwrap();
        let s = sale(900, 900, 0);
        cashbox.record_sale(s.clone()).unwrap();
        let session = cashbox.record_sale(s).unwrap();
        assert_eq!(session.sales.len(), 1);
        assert_eq!(session.totals.sales_total, cents(900));
    }

    #[test]
    fn test_out_of_range_opening_is_rejected() {
        let mut cashbox = Cashbox::new();
        assert!(matches!(cashbox.open(cents(i64::MAX)), Err(CoreError::InvalidAmount { .. })));
        assert!(!cashbox.is_open());
    }

    #[test]
    fn test_total_overflow_is_reported_and_undone() {
        let opening = validation::MAX_AMOUNT;
        let mut cashbox = Cashbox::new();
        cashbox.open(opening).unwrap();

        // expected_total lands exactly on i64::MAX
        let big = sale(0, i64::MAX - opening.cents(), 0);
        let big_id = big.id.clone();
        cashbox.record_sale(big).unwrap();
        let before = cashbox.clone();

        let err = cashbox.record_income(cents(1), "tip").unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { ref field, .. } if field == "expected_total"));
        assert_eq!(cashbox, before);

        assert!(matches!(cashbox.record_sale(sale(1, 1, 0)), Err(CoreError::InvalidAmount { .. })));
        assert_eq!(cashbox, before);

        // cancel the big sale, record a small one, then reactivating must fail
        cashbox.set_sale_canceled(&big_id, true).unwrap();
        cashbox.record_sale(sale(1, 1, 0)).unwrap();
        let canceled = cashbox.clone();
        assert!(matches!(cashbox.set_sale_canceled(&big_id, false), Err(CoreError::InvalidAmount { .. })));
        assert_eq!(cashbox, canceled);
        assert!(cashbox.active().unwrap().find_sale(&big_id).unwrap().canceled);
    }

    #[test]
    fn test_close_with_out_of_range_difference_keeps_session_open() {
        let mut cashbox = Cashbox::new();
        cashbox.open(validation::MAX_AMOUNT).unwrap();
        let before = cashbox.clone();

        let err = cashbox.close(cents(i64::MIN)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { ref field, .. } if field == "difference"));
        assert_eq!(cashbox, before);
    }

    #[test]
    fn test_session_snapshot_roundtrips_through_json() {
        let mut cashbox = Cashbox::new();
        cashbox.open(cents(2_500)).unwrap();
        cashbox.record_sale(sale(1_000, 1_000, 0)).unwrap();
        let session = cashbox.active().unwrap().clone();

        let json = serde_json::to_string(&session).unwrap();
        let restored: CashboxSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
        assert_eq!(Cashbox::restore(Some(restored)).active(), Some(&session));
    }
}
