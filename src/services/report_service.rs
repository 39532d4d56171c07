use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::reports::{
        CreateSaleRequest, CsvExportQuery, DailySales, MonthlySales, ProductPerformance,
        ProductUnits, ReportRangeQuery, SaleList, SalesSummary, UpdateSaleRequest,
    },
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{Column as ProdCol, Entity as Products},
        sales::{ActiveModel as SaleActive, Column as SaleCol, Entity as Sales, Model as SaleModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Sale,
    response::{ApiResponse, Meta},
    state::AppState,
};

async fn sales_in_range(
    state: &AppState,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<SaleModel>> {
    Ok(Sales::find()
        .filter(SaleCol::SaleDate.between(start, end))
        .order_by_asc(SaleCol::SaleDate)
        .all(&state.orm)
        .await?)
}

fn total_of(sales: &[SaleModel]) -> Decimal {
    sales.iter().map(|s| s.amount).sum()
}

fn daily_rollup(sales: &[SaleModel]) -> Vec<DailySales> {
    let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for sale in sales {
        let day = sale.sale_date.with_timezone(&Utc).date_naive();
        *by_day.entry(day).or_default() += sale.amount;
    }
    by_day
        .into_iter()
        .map(|(date, total)| DailySales { date, total })
        .collect()
}

fn monthly_rollup(sales: &[SaleModel]) -> Vec<MonthlySales> {
    let mut by_month: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
    for sale in sales {
        let date = sale.sale_date.with_timezone(&Utc);
        *by_month.entry((date.year(), date.month())).or_default() += sale.amount;
    }
    by_month
        .into_iter()
        .map(|((year, month), total)| MonthlySales { year, month, total })
        .collect()
}

async fn fast_movers(state: &AppState) -> AppResult<Vec<ProductUnits>> {
    let threshold = state.config.mover_threshold;
    let items = Products::find()
        .filter(ProdCol::UnitsSold.gt(threshold as i32))
        .order_by_desc(ProdCol::UnitsSold)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| ProductUnits {
            name: p.name,
            units_sold: p.units_sold as i64,
        })
        .collect();
    Ok(items)
}

/// Includes products that never sold at all.
async fn slow_movers(state: &AppState) -> AppResult<Vec<ProductUnits>> {
    let threshold = state.config.mover_threshold;
    let items = Products::find()
        .filter(ProdCol::UnitsSold.lt(threshold as i32))
        .order_by_asc(ProdCol::UnitsSold)
        .order_by_asc(ProdCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| ProductUnits {
            name: p.name,
            units_sold: p.units_sold as i64,
        })
        .collect();
    Ok(items)
}

/// Units and revenue per product over the orders that produced sales in the
/// window, priced at the checkout-time snapshot.
async fn product_performance(
    state: &AppState,
    sales: &[SaleModel],
) -> AppResult<Vec<ProductPerformance>> {
    let order_ids: Vec<Uuid> = sales.iter().map(|s| s.order_id).collect();
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .find_also_related(Products)
        .all(&state.orm)
        .await?;

    let mut by_name: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
    for (item, product) in rows {
        let name = product
            .map(|p| p.name)
            .unwrap_or_else(|| item.product_id.to_string());
        let entry = by_name.entry(name).or_insert((0, Decimal::ZERO));
        entry.0 += item.quantity as i64;
        entry.1 += item.unit_price * Decimal::from(item.quantity);
    }

    let mut performance: Vec<ProductPerformance> = by_name
        .into_iter()
        .map(|(name, (units_sold, revenue))| ProductPerformance {
            name,
            units_sold,
            revenue,
        })
        .collect();
    performance.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));
    Ok(performance)
}

pub async fn sales_summary(
    state: &AppState,
    user: &AuthUser,
    query: ReportRangeQuery,
) -> AppResult<ApiResponse<SalesSummary>> {
    ensure_admin(user)?;
    let (start, end) = query.normalize();
    let sales = sales_in_range(state, start, end).await?;

    let data = SalesSummary {
        total_sales: total_of(&sales),
        daily: daily_rollup(&sales),
        monthly: monthly_rollup(&sales),
        fast_movers: fast_movers(state).await?,
        slow_movers: slow_movers(state).await?,
        product_performance: product_performance(state, &sales).await?,
    };

    Ok(ApiResponse::success("Sales summary", data, Some(Meta::empty())))
}

pub async fn list_sales(
    state: &AppState,
    user: &AuthUser,
    query: ReportRangeQuery,
) -> AppResult<ApiResponse<SaleList>> {
    ensure_admin(user)?;
    let (start, end) = query.normalize();
    let items = sales_in_range(state, start, end)
        .await?
        .into_iter()
        .map(Sale::from)
        .collect();
    Ok(ApiResponse::success(
        "Sales",
        SaleList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_sale(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSaleRequest,
) -> AppResult<ApiResponse<Sale>> {
    ensure_admin(user)?;
    if payload.amount < Decimal::ZERO {
        return Err(AppError::BadRequest("Amount cannot be negative".into()));
    }

    let sale = SaleActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(payload.order_id),
        amount: Set(payload.amount),
        sale_date: Set(payload.sale_date.unwrap_or_else(Utc::now).into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Sale recorded",
        sale.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_sale(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSaleRequest,
) -> AppResult<ApiResponse<Sale>> {
    ensure_admin(user)?;

    let sale = Sales::find_by_id(id).one(&state.orm).await?;
    let sale = match sale {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: SaleActive = sale.into();
    if let Some(amount) = payload.amount {
        if amount < Decimal::ZERO {
            return Err(AppError::BadRequest("Amount cannot be negative".into()));
        }
        active.amount = Set(amount);
    }
    if let Some(sale_date) = payload.sale_date {
        active.sale_date = Set(sale_date.into());
    }
    let sale = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Sale updated", sale.into(), Some(Meta::empty())))
}

pub async fn delete_sale(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let sale = Sales::find_by_id(id).one(&state.orm).await?;
    let sale = match sale {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    sale.delete(&state.orm).await?;

    Ok(ApiResponse::success(
        "Sale deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub const CSV_HEADER: &str = "ID,Order ID,Amount (LKR),Sale Date,Most Sold Items";
const CSV_EMPTY_ROW: &str = "No sales data available for the selected period.";

/// Renders the sales CSV for the trailing window. Returns the suggested
/// filename together with the body.
pub async fn export_csv(
    state: &AppState,
    user: &AuthUser,
    query: CsvExportQuery,
) -> AppResult<(String, String)> {
    ensure_admin(user)?;

    let end = Utc::now();
    let start = end - Duration::days(query.days.unwrap_or(30).max(1));
    let sales = sales_in_range(state, start, end).await?;

    let filename = format!("sales-report-{}.csv", end.format("%Y%m%d-%H%M%S"));

    let mut body = String::new();
    body.push_str(CSV_HEADER);
    body.push('\n');

    if sales.is_empty() {
        body.push_str(CSV_EMPTY_ROW);
        body.push('\n');
        return Ok((filename, body));
    }

    let movers = fast_movers(state).await?;
    let movers_summary = if movers.is_empty() {
        "N/A".to_string()
    } else {
        movers
            .iter()
            .map(|m| format!("{} (Sold: {})", m.name, m.units_sold))
            .collect::<Vec<_>>()
            .join("; ")
    };

    for (idx, sale) in sales.iter().enumerate() {
        // The movers column is a report-level summary, written once.
        let movers_cell = if idx == 0 { movers_summary.as_str() } else { "" };
        body.push_str(&format!(
            "{},{},{},{},{}\n",
            sale.id,
            sale.order_id,
            sale.amount.round_dp(2),
            sale.sale_date.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S"),
            csv_escape(movers_cell),
        ));
    }

    Ok((filename, body))
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::csv_escape;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
