use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Delivery, Order, Product};

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail seam. Sends are always best-effort: callers log failures
/// and never let them fail the surrounding operation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailerError>;
}

/// Default transport: writes the message to the log instead of a wire.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailerError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "email dispatched"
        );
        Ok(())
    }
}

pub fn order_confirmation(to: &str, order: &Order) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Order Confirmation - Order #{}", order.id),
        body: format!(
            "Order Confirmation: Order #{} placed on {} for LKR {}.",
            order.id, order.order_date, order.total_amount
        ),
    }
}

pub fn order_cancellation(to: &str, order: &Order) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Order Cancelled - Order #{}", order.id),
        body: format!(
            "Order #{} has been cancelled. Stock has been reverted and no charge applies.",
            order.id
        ),
    }
}

pub fn delivery_update(to: &str, delivery: &Delivery) -> EmailMessage {
    let tracking = delivery.tracking_number.as_deref().unwrap_or("pending");
    EmailMessage {
        to: to.to_string(),
        subject: "Delivery Update - Fresh Mart".to_string(),
        body: format!(
            "Your delivery for order #{} is now {}. Tracking number: {}.",
            delivery.order_id, delivery.status, tracking
        ),
    }
}

pub fn low_stock_alert(to: &str, product: &Product) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Low Stock Alert: {}", product.name),
        body: format!(
            "Product {} has {} units left.",
            product.name, product.stock_quantity
        ),
    }
}
