use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    pub order_id: Uuid,
    pub comment: String,
    pub rating: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub comment: String,
    pub rating: i32,
}
