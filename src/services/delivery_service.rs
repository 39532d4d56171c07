use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::deliveries::{DeliveryCounts, UpdateDeliveryStatusRequest},
    entity::{
        deliveries::{
            ActiveModel as DeliveryActive, Column as DeliveryCol, DeliveryStatus,
            Entity as Deliveries,
        },
        orders::{ActiveModel as OrderActive, Entity as Orders, OrderStatus},
        sales::ActiveModel as SaleActive,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    mailer,
    middleware::auth::{AuthUser, ensure_admin},
    models::Delivery,
    response::{ApiResponse, Meta},
    services::order_service::revert_order_stock,
    state::AppState,
};

const TRACKING_PREFIX: &str = "TRK";
const TRACKING_SUFFIX_LEN: usize = 7;
const TRACKING_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_tracking_number() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TRACKING_SUFFIX_LEN)
        .map(|_| TRACKING_CHARSET[rng.gen_range(0..TRACKING_CHARSET.len())] as char)
        .collect();
    format!("{}{}", TRACKING_PREFIX, suffix)
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDeliveryStatusRequest,
) -> AppResult<ApiResponse<Delivery>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let delivery = Deliveries::find_by_id(id).one(&txn).await?;
    let delivery = match delivery {
        Some(d) => d,
        None => return Err(AppError::NotFound),
    };

    let previous = delivery.status;
    let next = payload.status;
    if !previous.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Cannot move delivery from {} to {}",
            previous, next
        )));
    }

    let order = Orders::find_by_id(delivery.order_id).one(&txn).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let now = Utc::now();
    let mut active: DeliveryActive = delivery.into();
    active.status = Set(next);
    // A delivery shipped without a tracking number gets one assigned here;
    // an existing number is never replaced.
    if next == DeliveryStatus::Shipped {
        if let sea_orm::ActiveValue::Unchanged(None) = &active.tracking_number {
            active.tracking_number = Set(Some(generate_tracking_number()));
        }
    }
    active.updated_at = Set(now.into());
    let delivery = active.update(&txn).await?;

    match next {
        DeliveryStatus::Shipped => {
            let mut order_active: OrderActive = order.into();
            order_active.status = Set(OrderStatus::Shipped);
            order_active.updated_at = Set(now.into());
            order_active.update(&txn).await?;
        }
        DeliveryStatus::Delivered => {
            let amount = order.total_amount;
            let order_id = order.id;
            let mut order_active: OrderActive = order.into();
            order_active.status = Set(OrderStatus::Completed);
            order_active.updated_at = Set(now.into());
            order_active.update(&txn).await?;

            SaleActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                amount: Set(amount),
                sale_date: Set(now.into()),
            }
            .insert(&txn)
            .await?;
        }
        DeliveryStatus::Cancelled => {
            // Stock was only still reserved while the parcel sat in PENDING;
            // once it left the warehouse the goods are gone either way.
            if previous == DeliveryStatus::Pending {
                revert_order_stock(&txn, order.id).await?;
            }
            let mut order_active: OrderActive = order.into();
            order_active.status = Set(OrderStatus::Cancelled);
            order_active.updated_at = Set(now.into());
            order_active.update(&txn).await?;
        }
        DeliveryStatus::Pending | DeliveryStatus::OutForDelivery => {}
    }

    txn.commit().await?;

    let delivery: Delivery = delivery.into();
    notify_delivery_update(state, &delivery).await;

    Ok(ApiResponse::success(
        "Delivery updated",
        delivery,
        Some(Meta::empty()),
    ))
}

pub async fn get_delivery(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Delivery>> {
    let delivery = Deliveries::find_by_id(id).one(&state.orm).await?;
    let delivery = match delivery {
        Some(d) => d,
        None => return Err(AppError::NotFound),
    };

    if ensure_admin(user).is_err() {
        let order = Orders::find_by_id(delivery.order_id).one(&state.orm).await?;
        let owns = order.map(|o| o.user_id == user.user_id).unwrap_or(false);
        if !owns {
            return Err(AppError::Forbidden);
        }
    }

    Ok(ApiResponse::success("OK", delivery.into(), Some(Meta::empty())))
}

pub async fn get_delivery_for_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Delivery>> {
    let order = Orders::find_by_id(order_id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.user_id != user.user_id && ensure_admin(user).is_err() {
        return Err(AppError::Forbidden);
    }

    let delivery = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?;
    let delivery = match delivery {
        Some(d) => d,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success("OK", delivery.into(), Some(Meta::empty())))
}

pub async fn counts(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DeliveryCounts>> {
    ensure_admin(user)?;

    async fn count_status(state: &AppState, status: DeliveryStatus) -> AppResult<u64> {
        Ok(Deliveries::find()
            .filter(DeliveryCol::Status.eq(status))
            .count(&state.orm)
            .await?)
    }

    let data = DeliveryCounts {
        pending: count_status(state, DeliveryStatus::Pending).await?,
        shipped: count_status(state, DeliveryStatus::Shipped).await?,
        out_for_delivery: count_status(state, DeliveryStatus::OutForDelivery).await?,
        delivered: count_status(state, DeliveryStatus::Delivered).await?,
        cancelled: count_status(state, DeliveryStatus::Cancelled).await?,
    };

    Ok(ApiResponse::success("Counts", data, Some(Meta::empty())))
}

async fn notify_delivery_update(state: &AppState, delivery: &Delivery) {
    let order = match Orders::find_by_id(delivery.order_id).one(&state.orm).await {
        Ok(Some(o)) => o,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(error = %err, "delivery email lookup failed");
            return;
        }
    };
    let account = match Users::find_by_id(order.user_id).one(&state.orm).await {
        Ok(Some(u)) => u,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(error = %err, "delivery email lookup failed");
            return;
        }
    };
    let message = mailer::delivery_update(&account.email, delivery);
    if let Err(err) = state.mailer.send(message).await {
        tracing::warn!(error = %err, delivery_id = %delivery.id, "delivery email failed");
    }
}
