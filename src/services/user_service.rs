use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::users::{
        ProcessRoleRequest, RoleRequestAction, RoleRequestList, RoleRequestView,
        SubmittedRoleRequest, UpdateProfileRequest, UserCount, UserList,
    },
    entity::{
        role_requests::{
            ActiveModel as RoleRequestActive, Column as RoleRequestCol, Entity as RoleRequests,
            RoleRequestStatus,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, ROLE_ADMIN},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service::hash_password,
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let account = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let account = match account {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Profile", account.into(), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let account = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let account = match account {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: UserActive = account.clone().into();

    if let Some(username) = payload.username {
        if username.trim().is_empty() {
            return Err(AppError::BadRequest("Username is required.".into()));
        }
        if username.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest(
                "Username should not contain only numbers.".into(),
            ));
        }
        if username != account.username {
            let taken = Users::find()
                .filter(UserCol::Username.eq(username.as_str()))
                .one(&state.orm)
                .await?
                .is_some();
            if taken {
                return Err(AppError::BadRequest("Username already taken.".into()));
            }
            active.username = Set(username);
        }
    }

    if let Some(email) = payload.email {
        if email != account.email {
            let taken = Users::find()
                .filter(UserCol::Email.eq(email.as_str()))
                .one(&state.orm)
                .await?
                .is_some();
            if taken {
                return Err(AppError::BadRequest("Email already registered.".into()));
            }
            active.email = Set(email);
        }
    }

    if let Some(password) = payload.password {
        if password.is_empty() {
            return Err(AppError::BadRequest("Password cannot be empty.".into()));
        }
        active.password_hash = Set(hash_password(&password)?);
    }

    let account = active.update(&state.orm).await?;
    Ok(ApiResponse::success(
        "Profile updated",
        account.into(),
        Some(Meta::empty()),
    ))
}

/// Deletes the calling user's account. Order history is kept; carts,
/// reviews and role requests cascade at the schema level.
pub async fn delete_account(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let account = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let account = match account {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    account.delete(&state.orm).await?;

    Ok(ApiResponse::success(
        "Account deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let items = Users::find()
        .order_by_asc(UserCol::Username)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::empty()),
    ))
}

pub async fn user_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserCount>> {
    ensure_admin(user)?;
    let registered_users = Users::find().count(&state.orm).await?;
    Ok(ApiResponse::success(
        "Count",
        UserCount { registered_users },
        Some(Meta::empty()),
    ))
}

pub async fn submit_role_request(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SubmittedRoleRequest>> {
    if user.role == ROLE_ADMIN {
        return Err(AppError::BadRequest(
            "Admin users cannot request role change".into(),
        ));
    }

    let pending = RoleRequests::find()
        .filter(RoleRequestCol::UserId.eq(user.user_id))
        .filter(RoleRequestCol::Status.eq(RoleRequestStatus::Pending))
        .one(&state.orm)
        .await?
        .is_some();
    if pending {
        return Err(AppError::BadRequest(
            "You already have a pending request".into(),
        ));
    }

    let now = Utc::now();
    let request = RoleRequestActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        status: Set(RoleRequestStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Role request submitted",
        SubmittedRoleRequest { id: request.id },
        Some(Meta::empty()),
    ))
}

pub async fn pending_role_requests(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<RoleRequestList>> {
    ensure_admin(user)?;

    let rows = RoleRequests::find()
        .filter(RoleRequestCol::Status.eq(RoleRequestStatus::Pending))
        .order_by_asc(RoleRequestCol::CreatedAt)
        .find_also_related(Users)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|(request, account)| RoleRequestView {
            username: account.map(|u| u.username).unwrap_or_default(),
            request: request.into(),
        })
        .collect();

    Ok(ApiResponse::success(
        "Pending requests",
        RoleRequestList { items },
        Some(Meta::empty()),
    ))
}

pub async fn process_role_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ProcessRoleRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let request = RoleRequests::find_by_id(id).one(&txn).await?;
    let request = match request {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if request.status != RoleRequestStatus::Pending {
        return Err(AppError::InvalidState("Request is not pending".into()));
    }

    let now = Utc::now();
    let (next_status, message) = match payload.action {
        RoleRequestAction::Approve => {
            let account = Users::find_by_id(request.user_id).one(&txn).await?;
            let account = match account {
                Some(u) => u,
                None => return Err(AppError::NotFound),
            };
            let mut active: UserActive = account.into();
            active.role = Set(ROLE_ADMIN.to_string());
            active.update(&txn).await?;
            (RoleRequestStatus::Approved, "Role request approved")
        }
        RoleRequestAction::Deny => (RoleRequestStatus::Denied, "Role request denied"),
    };

    let mut active: RoleRequestActive = request.into();
    active.status = Set(next_status);
    active.updated_at = Set(now.into());
    active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        message,
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
