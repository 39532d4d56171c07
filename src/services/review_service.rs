use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::{
        products::ReviewList,
        reviews::{SubmitReviewRequest, UpdateReviewRequest},
    },
    entity::{
        deliveries::{Column as DeliveryCol, DeliveryStatus, Entity as Deliveries},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::Entity as Orders,
        products::{ActiveModel as ProductActive, Entity as Products},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

pub async fn submit_review(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(payload.order_id).one(&txn).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let delivered = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .filter(DeliveryCol::Status.eq(DeliveryStatus::Delivered))
        .one(&txn)
        .await?
        .is_some();
    if !delivered {
        return Err(AppError::InvalidState(
            "Can only review delivered orders".into(),
        ));
    }

    let already_reviewed = Reviews::find()
        .filter(ReviewCol::OrderId.eq(order.id))
        .one(&txn)
        .await?
        .is_some();
    if already_reviewed {
        return Err(AppError::InvalidState(
            "Order has already been reviewed".into(),
        ));
    }

    // The review attaches to the first line of the order.
    let first_item = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .one(&txn)
        .await?;
    let first_item = match first_item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let now = Utc::now();
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        product_id: Set(first_item.product_id),
        user_id: Set(user.user_id),
        comment: Set(payload.comment),
        rating: Set(payload.rating),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    recompute_rating(&txn, first_item.product_id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review submitted",
        review.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;

    let txn = state.orm.begin().await?;

    let review = Reviews::find_by_id(id).one(&txn).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if review.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let product_id = review.product_id;
    let mut active: ReviewActive = review.into();
    active.comment = Set(payload.comment);
    active.rating = Set(payload.rating);
    active.updated_at = Set(Utc::now().into());
    let review = active.update(&txn).await?;

    recompute_rating(&txn, product_id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review updated",
        review.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let review = Reviews::find_by_id(id).one(&txn).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if review.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let product_id = review.product_id;
    review.delete(&txn).await?;
    recompute_rating(&txn, product_id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Moderation path; skips the ownership check.
pub async fn delete_review_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let review = Reviews::find_by_id(id).one(&txn).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    let product_id = review.product_id;
    review.delete(&txn).await?;
    recompute_rating(&txn, product_id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_reviews(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReviewList>> {
    let items = Reviews::find()
        .filter(ReviewCol::UserId.eq(user.user_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_all_reviews(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_admin(user)?;
    let items = Reviews::find()
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

/// Stores the arithmetic mean of the product's ratings, 0.0 when none remain.
async fn recompute_rating<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<()> {
    let ratings: Vec<i32> = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().sum::<i32>() as f64 / ratings.len() as f64
    };

    let product = Products::find_by_id(product_id).one(conn).await?;
    if let Some(product) = product {
        let mut active: ProductActive = product.into();
        active.rating = Set(rating);
        active.update(conn).await?;
    }
    Ok(())
}
