//! # Report Commands
//!
//! Read-only aggregates over the sale ledger and purchases.
//!
//! Range-based reports take optional `start` and `end`; a missing bound
//! defaults to "one year before now" and "now" respectively. Windows are
//! half-open, `[start, end)`.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use till_core::reports::{
    DateRange, MarginSummary, MonthComparison, MonthlySales, PaymentSplit, PeriodGroup, PeriodSales, TopProduct,
};
use till_core::validation::require;
use till_core::CoreError;

fn window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> DateRange {
    DateRange::resolve(start, end, Utc::now())
}

/// Non-canceled sales of one calendar month, newest first, with their sum.
///
/// ## Returns
/// * `Err(MISSING_REQUIRED_FIELD)` - `year` or `month` absent
/// * `Err(VALIDATION_ERROR)` - `month` outside 1-12
pub async fn sales_by_month(db: &DbState, year: Option<i32>, month: Option<u32>) -> Result<MonthlySales, ApiError> {
    let year = require("year", year).map_err(CoreError::from)?;
    let month = require("month", month).map_err(CoreError::from)?;
    debug!(year = year, month = month, "sales_by_month command");

    let range = DateRange::calendar_month(year, month)?;
    Ok(db.inner().reports().monthly_sales(range).await?)
}

/// Sales bucketed by day, month or year, canceled ones included and counted.
pub async fn sales_by_period(
    db: &DbState,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    group: PeriodGroup,
) -> Result<Vec<PeriodSales>, ApiError> {
    let range = window(start, end);
    Ok(db.inner().reports().sales_by_period(range, group).await?)
}

/// Twelve rows, January to December, of non-canceled sales against
/// purchase totals.
pub async fn sales_vs_purchases(db: &DbState, year: Option<i32>) -> Result<Vec<MonthComparison>, ApiError> {
    let year = require("year", year).map_err(CoreError::from)?;
    debug!(year = year, "sales_vs_purchases command");

    let range = DateRange::calendar_year(year)?;
    Ok(db.inner().reports().sales_vs_purchases(range).await?)
}

/// Best sellers by number of sales. `limit` defaults to
/// `reports.top_products_limit`.
pub async fn top_products(
    db: &DbState,
    config: &ConfigState,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: Option<u32>,
) -> Result<Vec<TopProduct>, ApiError> {
    let limit = limit.unwrap_or(config.reports.top_products_limit);
    let range = window(start, end);
    Ok(db.inner().reports().top_products(range, limit as usize).await?)
}

pub async fn payment_methods(
    db: &DbState,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<PaymentSplit, ApiError> {
    Ok(db.inner().reports().payment_methods(window(start, end)).await?)
}

/// Sales against purchases at cost for the window, with the average ticket.
pub async fn margin_summary(
    db: &DbState,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<MarginSummary, ApiError> {
    Ok(db.inner().reports().margin_summary(window(start, end)).await?)
}
