use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Sale;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRangeQuery {
    /// Defaults to 30 days ago.
    pub start: Option<DateTime<Utc>>,
    /// Defaults to now.
    pub end: Option<DateTime<Utc>>,
}

impl ReportRangeQuery {
    pub fn normalize(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.end.unwrap_or_else(Utc::now);
        let start = self
            .start
            .unwrap_or_else(|| end - chrono::Duration::days(30));
        (start, end)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CsvExportQuery {
    /// Window size in days, counting back from now.
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSaleRequest {
    pub order_id: Uuid,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub sale_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSaleRequest {
    #[schema(value_type = f64)]
    pub amount: Option<Decimal>,
    pub sale_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SaleList {
    #[schema(value_type = Vec<Sale>)]
    pub items: Vec<Sale>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummary {
    #[schema(value_type = f64)]
    pub total_sales: Decimal,
    pub daily: Vec<DailySales>,
    pub monthly: Vec<MonthlySales>,
    pub fast_movers: Vec<ProductUnits>,
    pub slow_movers: Vec<ProductUnits>,
    pub product_performance: Vec<ProductPerformance>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySales {
    pub date: NaiveDate,
    #[schema(value_type = f64)]
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    #[schema(value_type = f64)]
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct ProductUnits {
    pub name: String,
    pub units_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPerformance {
    pub name: String,
    pub units_sold: i64,
    #[schema(value_type = f64)]
    pub revenue: Decimal,
}
