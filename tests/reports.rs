mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{create_admin, create_product, create_user, setup_state};
use freshmart_api::{
    dto::{
        cart::AddToCartRequest,
        orders::CheckoutRequest,
        reports::{CreateSaleRequest, CsvExportQuery, ReportRangeQuery, UpdateSaleRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{cart_service, order_service, report_service},
    state::AppState,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

async fn placed_order(state: &AppState, user: &AuthUser, product_id: Uuid) -> anyhow::Result<Uuid> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;
    let order = order_service::checkout(
        state,
        user,
        CheckoutRequest {
            delivery_method: "PICKUP".to_string(),
            payment_method: None,
            address: None,
        },
    )
    .await?
    .data
    .unwrap()
    .order;
    Ok(order.id)
}

fn full_range() -> ReportRangeQuery {
    ReportRangeQuery {
        start: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        end: Some(Utc::now() + Duration::days(1)),
    }
}

#[tokio::test]
async fn rollups_group_by_day_and_month() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let user = create_user(&state, "shopper").await?;
    let rice = create_product(&state, "Red Rice 1kg", dec!(320.00), 10).await?;
    let order_id = placed_order(&state, &user, rice.id).await?;

    let jan_3 = Utc.with_ymd_and_hms(2026, 1, 3, 9, 0, 0).unwrap();
    let jan_3_later = Utc.with_ymd_and_hms(2026, 1, 3, 18, 30, 0).unwrap();
    let feb_1 = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
    for (amount, date) in [
        (dec!(100.00), jan_3),
        (dec!(50.00), jan_3_later),
        (dec!(200.00), feb_1),
    ] {
        report_service::create_sale(
            &state,
            &admin,
            CreateSaleRequest {
                order_id,
                amount,
                sale_date: Some(date),
            },
        )
        .await?;
    }

    let summary = report_service::sales_summary(&state, &admin, full_range())
        .await?
        .data
        .unwrap();

    assert_eq!(summary.total_sales, dec!(350.00));

    let jan_3_bucket = summary
        .daily
        .iter()
        .find(|d| d.date == jan_3.date_naive())
        .expect("bucket for Jan 3");
    assert_eq!(jan_3_bucket.total, dec!(150.00));

    let jan_bucket = summary
        .monthly
        .iter()
        .find(|m| m.year == 2026 && m.month == 1)
        .expect("bucket for January");
    assert_eq!(jan_bucket.total, dec!(150.00));
    let feb_bucket = summary
        .monthly
        .iter()
        .find(|m| m.year == 2026 && m.month == 2)
        .expect("bucket for February");
    assert_eq!(feb_bucket.total, dec!(200.00));

    // Reports are an admin surface.
    let err = report_service::sales_summary(&state, &user, full_range())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
async fn movers_split_on_threshold() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;

    // Threshold is 30 in the test config.
    let tea = create_product(&state, "Ceylon Tea", dec!(850.00), 50).await?;
    let mut active: freshmart_api::entity::products::ActiveModel = tea.into();
    active.units_sold = Set(40);
    active.update(&state.orm).await?;
    create_product(&state, "Dragon Fruit", dec!(600.00), 5).await?;

    let summary = report_service::sales_summary(&state, &admin, full_range())
        .await?
        .data
        .unwrap();

    assert_eq!(summary.fast_movers.len(), 1);
    assert_eq!(summary.fast_movers[0].name, "Ceylon Tea");
    assert_eq!(summary.fast_movers[0].units_sold, 40);

    // Products that never sold still show up as slow movers.
    assert!(
        summary
            .slow_movers
            .iter()
            .any(|p| p.name == "Dragon Fruit" && p.units_sold == 0)
    );

    Ok(())
}

#[tokio::test]
async fn csv_export_layout() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let user = create_user(&state, "shopper").await?;

    // Empty window first.
    let (filename, body) = report_service::export_csv(
        &state,
        &admin,
        CsvExportQuery { days: Some(7) },
    )
    .await?;
    assert!(filename.starts_with("sales-report-"));
    assert!(filename.ends_with(".csv"));
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("ID,Order ID,Amount (LKR),Sale Date,Most Sold Items")
    );
    assert_eq!(
        lines.next(),
        Some("No sales data available for the selected period.")
    );

    // With data the first row carries the movers summary.
    let tea = create_product(&state, "Ceylon Tea", dec!(850.00), 50).await?;
    let mut active: freshmart_api::entity::products::ActiveModel = tea.clone().into();
    active.units_sold = Set(40);
    active.update(&state.orm).await?;
    let order_id = placed_order(&state, &user, tea.id).await?;
    report_service::create_sale(
        &state,
        &admin,
        CreateSaleRequest {
            order_id,
            amount: dec!(850.00),
            sale_date: None,
        },
    )
    .await?;

    let (_filename, body) =
        report_service::export_csv(&state, &admin, CsvExportQuery { days: None }).await?;
    let data_row = body.lines().nth(1).expect("one data row");
    assert!(data_row.contains("850.00"));
    assert!(data_row.contains("Ceylon Tea (Sold: 41)"));

    Ok(())
}

#[tokio::test]
async fn sale_rows_are_correctable() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let admin = create_admin(&state, "ops").await?;
    let user = create_user(&state, "shopper").await?;
    let rice = create_product(&state, "Red Rice 1kg", dec!(320.00), 10).await?;
    let order_id = placed_order(&state, &user, rice.id).await?;

    let sale = report_service::create_sale(
        &state,
        &admin,
        CreateSaleRequest {
            order_id,
            amount: dec!(320.00),
            sale_date: None,
        },
    )
    .await?
    .data
    .unwrap();

    let updated = report_service::update_sale(
        &state,
        &admin,
        sale.id,
        UpdateSaleRequest {
            amount: Some(dec!(300.00)),
            sale_date: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.amount, dec!(300.00));

    report_service::delete_sale(&state, &admin, sale.id).await?;
    let listed = report_service::list_sales(&state, &admin, full_range())
        .await?
        .data
        .unwrap();
    assert!(listed.items.is_empty());

    Ok(())
}
