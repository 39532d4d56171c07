use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatbotOrdersQuery {
    /// Username or email; the lookup tries both.
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatbotOrderSummary {
    pub order_id: Uuid,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub status: String,
    pub date: DateTime<Utc>,
    /// Human-readable line list, e.g. "2x Carrots, 1x Red Rice".
    pub items: String,
    pub address: String,
    pub delivery_status: String,
    pub tracking_number: String,
}
