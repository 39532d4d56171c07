mod common;

use common::{create_admin, create_product, create_user, setup_state};
use freshmart_api::{
    dto::{cart::AddToCartRequest, deliveries::UpdateDeliveryStatusRequest, orders::CheckoutRequest},
    entity::{
        products::Entity as Products,
        sales::{Column as SaleCol, Entity as Sales},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{DeliveryStatus, OrderStatus},
    services::{cart_service, delivery_service, order_service},
    state::AppState,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

async fn place_order(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<(Uuid, Uuid)> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id,
            quantity,
        },
    )
    .await?;
    let detail = order_service::checkout(
        state,
        user,
        CheckoutRequest {
            delivery_method: "DELIVERY".to_string(),
            payment_method: None,
            address: Some("3 Lake Drive, Galle".to_string()),
        },
    )
    .await?
    .data
    .unwrap();
    let delivery_id = detail.delivery.unwrap().id;
    Ok((detail.order.id, delivery_id))
}

async fn advance(
    state: &AppState,
    admin: &AuthUser,
    delivery_id: Uuid,
    status: DeliveryStatus,
) -> Result<freshmart_api::models::Delivery, AppError> {
    delivery_service::update_status(
        state,
        admin,
        delivery_id,
        UpdateDeliveryStatusRequest { status },
    )
    .await
    .map(|resp| resp.data.unwrap())
}

#[tokio::test]
async fn full_delivery_chain_completes_order() -> anyhow::Result<()> {
    let (state, mailer) = setup_state().await?;
    let user = create_user(&state, "shopper").await?;
    let admin = create_admin(&state, "ops").await?;
    let rice = create_product(&state, "Red Rice 1kg", dec!(320.00), 10).await?;

    let (order_id, delivery_id) = place_order(&state, &user, rice.id, 2).await?;
    mailer.sent.lock().unwrap().clear();

    let shipped = advance(&state, &admin, delivery_id, DeliveryStatus::Shipped).await?;
    assert_eq!(shipped.status, DeliveryStatus::Shipped);
    assert!(
        shipped.tracking_number.is_some(),
        "tracking survives shipping"
    );
    let order = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Shipped);

    advance(&state, &admin, delivery_id, DeliveryStatus::OutForDelivery).await?;
    let delivered = advance(&state, &admin, delivery_id, DeliveryStatus::Delivered).await?;
    assert_eq!(delivered.status, DeliveryStatus::Delivered);

    let order = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Completed);

    // Completion writes the sale fact row at the order total.
    let sale = Sales::find()
        .filter(SaleCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .expect("sale recorded on delivery");
    assert_eq!(sale.amount, dec!(640.00));

    // One customer email per transition.
    assert_eq!(mailer.subjects().len(), 3);

    Ok(())
}

#[tokio::test]
async fn transitions_are_guarded() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let user = create_user(&state, "shopper").await?;
    let admin = create_admin(&state, "ops").await?;
    let tea = create_product(&state, "Ceylon Tea", dec!(850.00), 5).await?;

    let (_order_id, delivery_id) = place_order(&state, &user, tea.id, 1).await?;

    // Skipping SHIPPED is not allowed.
    let err = advance(&state, &admin, delivery_id, DeliveryStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Customers cannot drive the courier state machine.
    let err = advance(&state, &user, delivery_id, DeliveryStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Terminal states reject further movement.
    advance(&state, &admin, delivery_id, DeliveryStatus::Cancelled).await?;
    let err = advance(&state, &admin, delivery_id, DeliveryStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn cancel_reverts_stock_only_before_shipping() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let user = create_user(&state, "shopper").await?;
    let admin = create_admin(&state, "ops").await?;

    // Cancelled while PENDING: goods go back on the shelf.
    let milk = create_product(&state, "Fresh Milk", dec!(480.00), 8).await?;
    let (_order_id, delivery_id) = place_order(&state, &user, milk.id, 3).await?;
    advance(&state, &admin, delivery_id, DeliveryStatus::Cancelled).await?;
    let milk_after = Products::find_by_id(milk.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(milk_after.stock_quantity, 8);
    assert_eq!(milk_after.units_sold, 0);

    // Cancelled after SHIPPED: the parcel already left, stock stays down.
    let bread = create_product(&state, "Brown Bread", dec!(260.00), 8).await?;
    let (order_id, delivery_id) = place_order(&state, &user, bread.id, 3).await?;
    advance(&state, &admin, delivery_id, DeliveryStatus::Shipped).await?;
    advance(&state, &admin, delivery_id, DeliveryStatus::Cancelled).await?;
    let bread_after = Products::find_by_id(bread.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(bread_after.stock_quantity, 5);

    let order = order_service::get_order(&state, &admin, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn delivery_counts_by_status() -> anyhow::Result<()> {
    let (state, _mailer) = setup_state().await?;
    let user = create_user(&state, "shopper").await?;
    let admin = create_admin(&state, "ops").await?;
    let rice = create_product(&state, "Red Rice 1kg", dec!(320.00), 20).await?;

    let (_o1, d1) = place_order(&state, &user, rice.id, 1).await?;
    let (_o2, _d2) = place_order(&state, &user, rice.id, 1).await?;
    advance(&state, &admin, d1, DeliveryStatus::Shipped).await?;

    let counts = delivery_service::counts(&state, &admin).await?.data.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.shipped, 1);
    assert_eq!(counts.delivered, 0);

    let err = delivery_service::counts(&state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}
