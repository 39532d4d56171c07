use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::deliveries::{DeliveryCounts, UpdateDeliveryStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Delivery,
    response::ApiResponse,
    services::delivery_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/counts", get(delivery_counts))
        .route("/{id}", get(get_delivery))
        .route("/{id}/status", patch(update_status))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/counts",
    responses(
        (status = 200, description = "Deliveries per status", body = ApiResponse<DeliveryCounts>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Deliveries"
)]
pub async fn delivery_counts(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DeliveryCounts>>> {
    Ok(Json(delivery_service::counts(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery detail", body = ApiResponse<Delivery>),
        (status = 403, description = "Not your delivery"),
        (status = 404, description = "Delivery not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Delivery>>> {
    Ok(Json(delivery_service::get_delivery(&state, &user, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/deliveries/{id}/status",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Status advanced", body = ApiResponse<Delivery>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Delivery not found"),
        (status = 409, description = "Transition not allowed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Deliveries"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> AppResult<Json<ApiResponse<Delivery>>> {
    Ok(Json(
        delivery_service::update_status(&state, &user, id, payload).await?,
    ))
}
