use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::entity::deliveries::DeliveryStatus;
pub use crate::entity::orders::OrderStatus;
pub use crate::entity::role_requests::RoleRequestStatus;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub agreed_to_terms: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock_quantity: i32,
    pub rating: f64,
    pub units_sold: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_date: DateTime<Utc>,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub delivery_method: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: DeliveryStatus,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: DateTime<Utc>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub order_id: Uuid,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub sale_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: RoleRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::users::Model> for User {
    fn from(model: crate::entity::users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            agreed_to_terms: model.agreed_to_terms,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::products::Model> for Product {
    fn from(model: crate::entity::products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category,
            image_url: model.image_url,
            price: model.price,
            stock_quantity: model.stock_quantity,
            rating: model.rating,
            units_sold: model.units_sold,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::cart_items::Model> for CartItem {
    fn from(model: crate::entity::cart_items::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::orders::Model> for Order {
    fn from(model: crate::entity::orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            order_date: model.order_date.with_timezone(&Utc),
            total_amount: model.total_amount,
            delivery_method: model.delivery_method,
            payment_method: model.payment_method,
            status: model.status,
            payment_status: model.payment_status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::order_items::Model> for OrderItem {
    fn from(model: crate::entity::order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::deliveries::Model> for Delivery {
    fn from(model: crate::entity::deliveries::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            status: model.status,
            tracking_number: model.tracking_number,
            estimated_delivery_date: model.estimated_delivery_date.with_timezone(&Utc),
            address: model.address,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::reviews::Model> for Review {
    fn from(model: crate::entity::reviews::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            user_id: model.user_id,
            comment: model.comment,
            rating: model.rating,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::sales::Model> for Sale {
    fn from(model: crate::entity::sales::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            amount: model.amount,
            sale_date: model.sale_date.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::role_requests::Model> for RoleRequest {
    fn from(model: crate::entity::role_requests::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
