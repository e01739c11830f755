//! # Reports Module
//!
//! Read-only aggregation over the sale and purchase ledgers.
//!
//! ## Split of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  till-db::ReportRepository            till-core::reports (THIS)         │
//! │  ─────────────────────────            ─────────────────────────         │
//! │  SELECT rows WHERE created_at         fold rows into report DTOs        │
//! │  in DateRange                ──────►  (sums, groups, ordering,          │
//! │                                        zero-filled months)              │
//! │                                                                         │
//! │  Every fold is a pure function: same rows in, same report out.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Canceled sales are excluded from every aggregate except
//! [`sales_by_period`], which counts them in `canceled_count` and keeps the
//! raw sum of amounts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Purchase, Sale};
use crate::validation;

// =============================================================================
// Date Range
// =============================================================================

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange { start, end }
    }

    /// The twelve months ending at `now`.
    pub fn last_year(now: DateTime<Utc>) -> Self {
        let start = now
            .checked_sub_months(Months::new(12))
            .unwrap_or_else(|| now - Duration::days(365));
        DateRange { start, end: now }
    }

    /// Fills missing bounds: start defaults to one year before `now`, end to
    /// `now`.
    pub fn resolve(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let default = DateRange::last_year(now);
        DateRange {
            start: start.unwrap_or(default.start),
            end: end.unwrap_or(default.end),
        }
    }

    /// One calendar month, 1-based.
    pub fn calendar_month(year: i32, month: u32) -> CoreResult<Self> {
        validation::validate_month(month)?;
        let start = first_instant(year, month)?;
        let end = if month == 12 {
            first_instant(year + 1, 1)?
        } else {
            first_instant(year, month + 1)?
        };
        Ok(DateRange { start, end })
    }

    /// One calendar year.
    pub fn calendar_year(year: i32) -> CoreResult<Self> {
        Ok(DateRange {
            start: first_instant(year, 1)?,
            end: first_instant(year + 1, 1)?,
        })
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn first_instant(year: i32, month: u32) -> CoreResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| {
            CoreError::Validation(ValidationError::InvalidFormat {
                field: "year".to_string(),
                reason: format!("{}-{:02} is not a valid calendar month", year, month),
            })
        })
}

// =============================================================================
// Period Grouping
// =============================================================================

/// Bucket size for [`sales_by_period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PeriodGroup {
    Day,
    #[default]
    Month,
    Year,
}

impl PeriodGroup {
    /// Sortable bucket key: `2024-03-15`, `2024-03` or `2024`.
    pub fn key(&self, at: DateTime<Utc>) -> String {
        let format = match self {
            PeriodGroup::Day => "%Y-%m-%d",
            PeriodGroup::Month => "%Y-%m",
            PeriodGroup::Year => "%Y",
        };
        at.format(format).to_string()
    }
}

/// Unrecognized group names fall back to monthly buckets.
impl FromStr for PeriodGroup {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "day" => PeriodGroup::Day,
            "year" => PeriodGroup::Year,
            _ => PeriodGroup::Month,
        })
    }
}

impl fmt::Display for PeriodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeriodGroup::Day => "day",
            PeriodGroup::Month => "month",
            PeriodGroup::Year => "year",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Report DTOs
// =============================================================================

/// Non-canceled sales of one calendar month, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlySales {
    pub rows: Vec<Sale>,
    pub total: Money,
}

/// One bucket of [`sales_by_period`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PeriodSales {
    pub period: String,
    /// Σ amount over every sale in the bucket, canceled included.
    pub sales: Money,
    /// Σ (cash + transfer).
    pub paid_total: Money,
    pub transfer_total: Money,
    pub canceled_count: u32,
}

/// One month of [`sales_vs_purchases`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthComparison {
    /// 1-12.
    pub month: u32,
    pub total_sales: Money,
    pub total_purchases: Money,
}

/// One row of [`top_products`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TopProduct {
    /// The sale description the row groups by.
    pub name: String,
    pub times_sold: u32,
    pub revenue: Money,
}

/// Result of [`payment_methods`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentSplit {
    pub total_cash: Money,
    pub total_transfer: Money,
}

/// Result of [`margin_summary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarginSummary {
    pub total_sales: Money,
    /// Σ purchase totals at cost.
    pub total_purchases: Money,
    pub gross_margin: Money,
    pub avg_ticket: Money,
}

// =============================================================================
// Folds
// =============================================================================

/// Keeps non-canceled sales, newest first, with their sum.
pub fn monthly_sales(sales: Vec<Sale>) -> MonthlySales {
    let mut rows: Vec<Sale> = sales.into_iter().filter(Sale::is_active).collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = rows.iter().map(|s| s.amount).sum();
    MonthlySales { rows, total }
}

/// Buckets sales by day, month or year, oldest bucket first.
pub fn sales_by_period(sales: &[Sale], group: PeriodGroup) -> Vec<PeriodSales> {
    let mut buckets: BTreeMap<String, PeriodSales> = BTreeMap::new();

    for sale in sales {
        let key = group.key(sale.created_at);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| PeriodSales {
            period: key,
            sales: Money::zero(),
            paid_total: Money::zero(),
            transfer_total: Money::zero(),
            canceled_count: 0,
        });
        bucket.sales += sale.amount;
        bucket.paid_total += sale.cash + sale.transfer;
        bucket.transfer_total += sale.transfer;
        if sale.canceled {
            bucket.canceled_count += 1;
        }
    }

    buckets.into_values().collect()
}

/// Twelve monthly rows (January first), zero-filled.
///
/// Rows are bucketed by the month of `created_at`; callers pass only the
/// rows of the year of interest.
pub fn sales_vs_purchases(sales: &[Sale], purchases: &[Purchase]) -> Vec<MonthComparison> {
    let mut months: Vec<MonthComparison> = (1..=12)
        .map(|month| MonthComparison {
            month,
            total_sales: Money::zero(),
            total_purchases: Money::zero(),
        })
        .collect();

    for sale in sales.iter().filter(|s| s.is_active()) {
        months[sale.created_at.month0() as usize].total_sales += sale.amount;
    }
    for purchase in purchases {
        months[purchase.created_at.month0() as usize].total_purchases += purchase.total;
    }

    months
}

/// Groups non-canceled sales by description.
///
/// Ordered by times sold, then revenue (both descending), then name.
pub fn top_products(sales: &[Sale], limit: usize) -> Vec<TopProduct> {
    let mut groups: HashMap<&str, TopProduct> = HashMap::new();

    for sale in sales.iter().filter(|s| s.is_active()) {
        let row = groups.entry(sale.description.as_str()).or_insert_with(|| TopProduct {
            name: sale.description.clone(),
            times_sold: 0,
            revenue: Money::zero(),
        });
        row.times_sold += 1;
        row.revenue += sale.amount;
    }

    let mut rows: Vec<TopProduct> = groups.into_values().collect();
    rows.sort_by(|a, b| {
        b.times_sold
            .cmp(&a.times_sold)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

/// Cash vs transfer over non-canceled sales.
pub fn payment_methods(sales: &[Sale]) -> PaymentSplit {
    sales
        .iter()
        .filter(|s| s.is_active())
        .fold(PaymentSplit::default(), |mut acc, sale| {
            acc.total_cash += sale.cash;
            acc.total_transfer += sale.transfer;
            acc
        })
}

/// Sales against purchase spend for the same window.
pub fn margin_summary(sales: &[Sale], purchases: &[Purchase]) -> MarginSummary {
    let active: Vec<&Sale> = sales.iter().filter(|s| s.is_active()).collect();
    let total_sales: Money = active.iter().map(|s| s.amount).sum();
    let total_purchases: Money = purchases.iter().map(|p| p.total).sum();

    MarginSummary {
        total_sales,
        total_purchases,
        gross_margin: total_sales - total_purchases,
        avg_ticket: total_sales.divide_by_count(active.len() as u64),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
