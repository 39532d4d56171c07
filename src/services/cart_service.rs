use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();

    let total = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await? as i64;

    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_desc(CartCol::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .find_also_related(Products)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for (line, product) in rows {
        let product = product.ok_or(AppError::NotFound)?;
        items.push(CartItemDto {
            id: line.id,
            product: product.into(),
            quantity: line.quantity,
        });
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::BadRequest("product not found".to_string())),
    };

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?;

    // Re-adding a product merges into the existing line.
    let requested = existing
        .as_ref()
        .map(|item| item.quantity)
        .unwrap_or_default()
        + payload.quantity;
    if requested > product.stock_quantity {
        return Err(AppError::InsufficientStock(product.name));
    }

    let cart_item = if let Some(item) = existing {
        let mut active: CartActive = item.into();
        active.quantity = Set(requested);
        active.update(&state.orm).await?
    } else {
        CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            product_id: Set(payload.product_id),
            quantity: Set(payload.quantity),
            created_at: Set(Utc::now().into()),
        }
        .insert(&state.orm)
        .await?
    };

    Ok(ApiResponse::success("OK", cart_item.into(), None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let item = CartItems::find_by_id(id).one(&state.orm).await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };
    if item.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let product = item
        .find_related(Products)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if payload.quantity > product.stock_quantity {
        return Err(AppError::InsufficientStock(product.name));
    }

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success("OK", updated.into(), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let item = CartItems::find_by_id(id).one(&state.orm).await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };
    if item.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    item.delete(&state.orm).await?;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
