use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{RoleRequest, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleRequestAction {
    Approve,
    Deny,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRoleRequest {
    pub action: RoleRequestAction,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleRequestView {
    pub request: RoleRequest,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleRequestList {
    pub items: Vec<RoleRequestView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCount {
    pub registered_users: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmittedRoleRequest {
    pub id: Uuid,
}
