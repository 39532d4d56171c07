use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::users::{SubmittedRoleRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_profile).patch(update_profile).delete(delete_account),
        )
        .route("/role-request", post(submit_role_request))
}

#[utoipa::path(
    get,
    path = "/api/account",
    responses(
        (status = 200, description = "Current user's profile", body = ApiResponse<User>),
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(user_service::get_profile(&state, &user).await?))
}

#[utoipa::path(
    patch,
    path = "/api/account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 400, description = "Validation failed or name taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(
        user_service::update_profile(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/account",
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<serde_json::Value>),
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(user_service::delete_account(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/account/role-request",
    responses(
        (status = 200, description = "Admin role requested", body = ApiResponse<SubmittedRoleRequest>),
        (status = 400, description = "Already admin or request pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn submit_role_request(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SubmittedRoleRequest>>> {
    Ok(Json(
        user_service::submit_role_request(&state, &user).await?,
    ))
}
