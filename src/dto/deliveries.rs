use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::DeliveryStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    pub status: DeliveryStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryCounts {
    pub pending: u64,
    pub shipped: u64,
    pub out_for_delivery: u64,
    pub delivered: u64,
    pub cancelled: u64,
}
