use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, OrderDetail, OrderList, UpdateOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        deliveries::{
            ActiveModel as DeliveryActive, Column as DeliveryCol, DeliveryStatus,
            Entity as Deliveries,
        },
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, DELIVERY_METHOD_DELIVERY,
            DELIVERY_METHOD_PICKUP, Entity as Orders, OrderStatus, PAYMENT_STATUS_PAID,
        },
        products::{Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    mailer,
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::delivery_service::generate_tracking_number,
    state::AppState,
};

const DEFAULT_PAYMENT_METHOD: &str = "CASH_ON_DELIVERY";
const ESTIMATED_DELIVERY_DAYS: i64 = 3;

fn validate_fulfilment(delivery_method: &str, address: Option<&str>) -> AppResult<()> {
    match delivery_method {
        DELIVERY_METHOD_PICKUP => Ok(()),
        DELIVERY_METHOD_DELIVERY => {
            if address.map(str::trim).unwrap_or_default().is_empty() {
                return Err(AppError::BadRequest(
                    "Delivery address is required for home delivery".into(),
                ));
            }
            Ok(())
        }
        _ => Err(AppError::BadRequest(
            "Delivery method must be DELIVERY or PICKUP".into(),
        )),
    }
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    validate_fulfilment(&payload.delivery_method, payload.address.as_deref())?;
    let payment_method = payload
        .payment_method
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .find_also_related(Products)
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut total_amount = Decimal::ZERO;
    for (line, product) in &lines {
        let product = product.as_ref().ok_or(AppError::NotFound)?;

        // Guarded decrement: the stock predicate makes the update a no-op
        // when another checkout drained the product first, and a no-op
        // aborts the whole transaction.
        let result = Products::update_many()
            .col_expr(
                ProdCol::StockQuantity,
                Expr::col(ProdCol::StockQuantity).sub(line.quantity),
            )
            .col_expr(
                ProdCol::UnitsSold,
                Expr::col(ProdCol::UnitsSold).add(line.quantity),
            )
            .filter(ProdCol::Id.eq(product.id))
            .filter(ProdCol::StockQuantity.gte(line.quantity))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::InsufficientStock(product.name.clone()));
        }

        total_amount += product.price * Decimal::from(line.quantity);
    }

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        order_date: Set(now.into()),
        total_amount: Set(total_amount),
        delivery_method: Set(payload.delivery_method.clone()),
        payment_method: Set(payment_method),
        status: Set(OrderStatus::Placed),
        payment_status: Set(PAYMENT_STATUS_PAID.to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (line, product) in &lines {
        let product = product.as_ref().ok_or(AppError::NotFound)?;
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(line.quantity),
            unit_price: Set(product.price),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        items.push(item.into());
    }

    let address = match payload.delivery_method.as_str() {
        DELIVERY_METHOD_DELIVERY => payload.address.map(|a| a.trim().to_string()),
        _ => None,
    };
    let delivery = DeliveryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        status: Set(DeliveryStatus::Pending),
        tracking_number: Set(Some(generate_tracking_number())),
        estimated_delivery_date: Set((now + Duration::days(ESTIMATED_DELIVERY_DAYS)).into()),
        address: Set(address),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let order: Order = order.into();
    notify_order(state, user.user_id, |to| mailer::order_confirmation(to, &order)).await;

    Ok(ApiResponse::success(
        "Order placed",
        OrderDetail {
            order,
            items,
            delivery: Some(delivery.into()),
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let delivery = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .one(&txn)
        .await?;

    let cancellable = order.status == OrderStatus::Placed
        && delivery
            .as_ref()
            .map(|d| d.status == DeliveryStatus::Pending)
            .unwrap_or(true);
    if !cancellable {
        return Err(AppError::InvalidState(
            "Order can no longer be cancelled".into(),
        ));
    }

    revert_order_stock(&txn, order.id).await?;

    let now = Utc::now();
    if let Some(delivery) = delivery {
        let mut active: DeliveryActive = delivery.into();
        active.status = Set(DeliveryStatus::Cancelled);
        active.updated_at = Set(now.into());
        active.update(&txn).await?;
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    let order: Order = order.into();
    notify_order(state, user.user_id, |to| mailer::order_cancellation(to, &order)).await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    validate_fulfilment(&payload.delivery_method, payload.address.as_deref())?;

    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let delivery = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .one(&txn)
        .await?;

    let editable = order.status == OrderStatus::Placed
        && delivery
            .as_ref()
            .map(|d| d.status == DeliveryStatus::Pending)
            .unwrap_or(true);
    if !editable {
        return Err(AppError::InvalidState(
            "Order can no longer be edited".into(),
        ));
    }

    let now = Utc::now();
    let address = match payload.delivery_method.as_str() {
        DELIVERY_METHOD_DELIVERY => payload.address.map(|a| a.trim().to_string()),
        _ => None,
    };

    let delivery = if let Some(delivery) = delivery {
        let mut active: DeliveryActive = delivery.into();
        active.address = Set(address);
        active.updated_at = Set(now.into());
        Some(active.update(&txn).await?)
    } else {
        None
    };

    let mut active: OrderActive = order.into();
    active.delivery_method = Set(payload.delivery_method);
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Order updated",
        OrderDetail {
            order: order.into(),
            items,
            delivery: delivery.map(Into::into),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    list_with_condition(state, condition, query).await
}

/// Admin view across all customers.
pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    list_with_condition(state, Condition::all(), query).await
}

async fn list_with_condition(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.user_id != user.user_id && ensure_admin(user).is_err() {
        return Err(AppError::Forbidden);
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let delivery = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .map(Into::into);

    Ok(ApiResponse::success(
        "OK",
        OrderDetail {
            order: order.into(),
            items,
            delivery,
        },
        Some(Meta::empty()),
    ))
}

/// Sends an order email to the account's address. The order is already
/// committed at this point, so lookup and transport failures are logged
/// and swallowed rather than turned into a response error.
async fn notify_order<F>(state: &AppState, user_id: Uuid, build: F)
where
    F: FnOnce(&str) -> mailer::EmailMessage,
{
    let account = match Users::find_by_id(user_id).one(&state.orm).await {
        Ok(Some(u)) => u,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(error = %err, "order email lookup failed");
            return;
        }
    };
    let message = build(&account.email);
    if let Err(err) = state.mailer.send(message).await {
        tracing::warn!(error = %err, to = %account.email, "order email failed");
    }
}

/// Puts every line of the order back into catalog stock. Shared by customer
/// cancellation and the courier-side delivery cancellation.
pub(crate) async fn revert_order_stock<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;

    for item in items {
        Products::update_many()
            .col_expr(
                ProdCol::StockQuantity,
                Expr::col(ProdCol::StockQuantity).add(item.quantity),
            )
            .col_expr(
                ProdCol::UnitsSold,
                Expr::col(ProdCol::UnitsSold).sub(item.quantity),
            )
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}
