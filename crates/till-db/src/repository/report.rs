//! # Report Repository
//!
//! Reads the sale and purchase rows of a window and hands them to the
//! folds in `till_core::reports`. Nothing here writes.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::purchase::PurchaseRepository;
use crate::repository::sale::SaleRepository;
use till_core::reports::{
    self, DateRange, MarginSummary, MonthComparison, MonthlySales, PaymentSplit, PeriodGroup, PeriodSales, TopProduct,
};

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    sales: SaleRepository,
    purchases: PurchaseRepository,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository {
            sales: SaleRepository::new(pool.clone()),
            purchases: PurchaseRepository::new(pool),
        }
    }

    /// Non-canceled sales of a window (normally one calendar month).
    pub async fn monthly_sales(&self, range: DateRange) -> DbResult<MonthlySales> {
        debug!(start = %range.start, end = %range.end, "Report: monthly sales");
        let sales = self.sales.list_between(range).await?;
        Ok(reports::monthly_sales(sales))
    }

    pub async fn sales_by_period(&self, range: DateRange, group: PeriodGroup) -> DbResult<Vec<PeriodSales>> {
        debug!(start = %range.start, end = %range.end, group = %group, "Report: sales by period");
        let sales = self.sales.list_between(range).await?;
        Ok(reports::sales_by_period(&sales, group))
    }

    /// Twelve monthly rows for a calendar year window.
    pub async fn sales_vs_purchases(&self, year: DateRange) -> DbResult<Vec<MonthComparison>> {
        debug!(start = %year.start, "Report: sales vs purchases");
        let sales = self.sales.list_between(year).await?;
        let purchases = self.purchases.list_between(year).await?;
        Ok(reports::sales_vs_purchases(&sales, &purchases))
    }

    pub async fn top_products(&self, range: DateRange, limit: usize) -> DbResult<Vec<TopProduct>> {
        debug!(start = %range.start, end = %range.end, limit = limit, "Report: top products");
        let sales = self.sales.list_between(range).await?;
        Ok(reports::top_products(&sales, limit))
    }

    pub async fn payment_methods(&self, range: DateRange) -> DbResult<PaymentSplit> {
        let sales = self.sales.list_between(range).await?;
        Ok(reports::payment_methods(&sales))
    }

    pub async fn margin_summary(&self, range: DateRange) -> DbResult<MarginSummary> {
        debug!(start = %range.start, end = %range.end, "Report: margin summary");
        let sales = self.sales.list_between(range).await?;
        let purchases = self.purchases.list_between(range).await?;
        Ok(reports::margin_summary(&sales, &purchases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Datelike, Duration, TimeZone, Utc};
    use till_core::{Money, ProductInput, PurchaseInput, Quantity, Sale, SupplierInput};

    async fn sale_at(db: &Database, desc: &str, cents: i64, canceled: bool, at: chrono::DateTime<Utc>) {
        let mut sale = Sale::new(desc, Money::from_cents(cents), Money::from_cents(cents), Money::zero());
        sale.created_at = at;
        sale.canceled = canceled;
        db.sales().insert(&sale).await.unwrap();
    }

    #[tokio::test]
    async fn test_monthly_sales_excludes_canceled_and_other_months() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let march = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        sale_at(&db, "Bread", 500, false, march).await;
        sale_at(&db, "Milk", 300, true, march).await;
        sale_at(&db, "Eggs", 700, false, march + Duration::days(30)).await;

        let report = db
            .reports()
            .monthly_sales(DateRange::calendar_month(2024, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.total.cents(), 500);
    }

    #[tokio::test]
    async fn test_sales_by_period_counts_canceled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        sale_at(&db, "Bread", 500, false, day).await;
        sale_at(&db, "Milk", 300, true, day).await;

        let rows = db
            .reports()
            .sales_by_period(DateRange::calendar_year(2024).unwrap(), PeriodGroup::Day)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].period, "2024-05-02");
        assert_eq!(rows[0].sales.cents(), 800);
        assert_eq!(rows[0].canceled_count, 1);
    }

    #[tokio::test]
    async fn test_margin_and_comparison_include_purchases() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = ProductInput { name: "Soap".to_string(), ..Default::default() }.into_product();
        db.products().insert(&product).await.unwrap();
        let supplier = db
            .suppliers()
            .create(&SupplierInput { name: "Clean Inc".to_string(), ..Default::default() })
            .await
            .unwrap();
        let valid = PurchaseInput {
            product_id: Some(product.id.clone()),
            supplier_id: Some(supplier.id),
            quantity: Some(Quantity::from_units(4)),
            unit_cost: Some(Money::from_cents(250)),
            ..Default::default()
        }
        .validate()
        .unwrap();
        db.purchases().create(&valid).await.unwrap();

        let now = Utc::now();
        sale_at(&db, "Soap", 600, false, now).await;
        sale_at(&db, "Soap", 600, false, now).await;

        let range = DateRange::new(now - Duration::days(1), now + Duration::days(1));
        let margin = db.reports().margin_summary(range).await.unwrap();
        assert_eq!(margin.total_sales.cents(), 1200);
        assert_eq!(margin.total_purchases.cents(), 1000);
        assert_eq!(margin.gross_margin.cents(), 200);
        assert_eq!(margin.avg_ticket.cents(), 600);

        let top = db.reports().top_products(range, 10).await.unwrap();
        assert_eq!(top[0].name, "Soap");
        assert_eq!(top[0].times_sold, 2);

        let year = DateRange::calendar_year(now.year()).unwrap();
        let months = db.reports().sales_vs_purchases(year).await.unwrap();
        assert_eq!(months.len(), 12);
        let total_purchases: Money = months.iter().map(|m| m.total_purchases).sum();
        assert_eq!(total_purchases.cents(), 1000);
    }
}
