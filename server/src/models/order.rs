// kibbledrop_server/src/models/order.rs

use chrono::{DateTime, Utc};
use kibbledrop_core::{DomainResult, OrderStatus};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// Status is stored as TEXT; the domain crate owns the canonical spellings
// and the legal transitions.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  /// Set when this order funds a subscription's first charge.
  pub subscription_id: Option<Uuid>,
  pub status: String,
  pub subtotal_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub currency: String,
  pub recipient_name: String,
  pub street: String,
  pub city: String,
  pub postal_code: String,
  pub phone: Option<String>,
  pub payment_provider: Option<String>,
  pub payment_reference: Option<String>,
  pub cancel_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn parsed_status(&self) -> DomainResult<OrderStatus> {
    self.status.parse()
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_at_purchase_cents: i64,
}
