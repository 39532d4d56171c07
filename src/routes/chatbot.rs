use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    dto::chatbot::{ChatbotOrderSummary, ChatbotOrdersQuery},
    entity::{
        deliveries::{Column as DeliveryCol, Entity as Deliveries},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders},
        products::Entity as Products,
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
};

const API_KEY_HEADER: &str = "x-api-key";

pub fn router() -> Router<AppState> {
    Router::new().route("/orders", get(orders_for_customer))
}

fn verify_api_key(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let expected = state
        .config
        .chatbot_api_key
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Chatbot API is disabled".into()))?;
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(AppError::Unauthorized("Invalid API key".into()));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/chatbot/orders",
    params(
        ("email" = String, Query, description = "Customer username or email"),
        ("X-API-KEY" = String, Header, description = "Chatbot integration key")
    ),
    responses(
        (status = 200, description = "Order summaries for the customer", body = ApiResponse<Vec<ChatbotOrderSummary>>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No such customer"),
    ),
    tag = "Chatbot"
)]
pub async fn orders_for_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatbotOrdersQuery>,
) -> AppResult<Json<ApiResponse<Vec<ChatbotOrderSummary>>>> {
    verify_api_key(&state, &headers)?;

    // The bot passes whatever the customer typed; try username first, then
    // fall back to email.
    let account = Users::find()
        .filter(UserCol::Username.eq(query.email.as_str()))
        .one(&state.orm)
        .await?;
    let account = match account {
        Some(u) => Some(u),
        None => {
            Users::find()
                .filter(UserCol::Email.eq(query.email.as_str()))
                .one(&state.orm)
                .await?
        }
    };
    let account = match account {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(account.id))
        .order_by_desc(OrderCol::OrderDate)
        .all(&state.orm)
        .await?;

    let mut summaries = Vec::with_capacity(orders.len());
    for order in orders {
        let lines = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .find_also_related(Products)
            .all(&state.orm)
            .await?;
        let items = lines
            .into_iter()
            .map(|(item, product)| {
                let name = product
                    .map(|p| p.name)
                    .unwrap_or_else(|| item.product_id.to_string());
                format!("{}x {}", item.quantity, name)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let delivery = Deliveries::find()
            .filter(DeliveryCol::OrderId.eq(order.id))
            .one(&state.orm)
            .await?;

        let (address, delivery_status, tracking_number) = match delivery {
            Some(d) => (
                d.address.unwrap_or_else(|| "Pickup / No Address".to_string()),
                d.status.to_string(),
                d.tracking_number.unwrap_or_else(|| "Pending".to_string()),
            ),
            None => (
                "Pickup / No Address".to_string(),
                "Not Scheduled".to_string(),
                "Pending".to_string(),
            ),
        };

        summaries.push(ChatbotOrderSummary {
            order_id: order.id,
            total_amount: order.total_amount,
            status: order.status.to_string(),
            date: order.order_date.with_timezone(&chrono::Utc),
            items,
            address,
            delivery_status,
            tracking_number,
        });
    }

    Ok(Json(ApiResponse::success(
        "Orders",
        summaries,
        Some(Meta::empty()),
    )))
}
