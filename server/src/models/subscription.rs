// kibbledrop_server/src/models/subscription.rs

use chrono::{DateTime, NaiveDate, Utc};
use kibbledrop_core::{DeliverySchedule, DomainResult, Frequency, SubscriptionStatus};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subscription {
  pub id: Uuid,
  pub user_id: Uuid,
  pub pet_profile_id: Option<Uuid>,
  pub frequency: String,
  pub status: String,
  pub next_delivery: Option<NaiveDate>,
  /// Ordered ISO date strings of deliveries the user skipped.
  pub skipped_deliveries: Vec<String>,
  pub payment_provider: Option<String>,
  pub payment_reference: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Subscription {
  pub fn parsed_status(&self) -> DomainResult<SubscriptionStatus> {
    self.status.parse()
  }

  pub fn parsed_frequency(&self) -> DomainResult<Frequency> {
    self.frequency.parse()
  }

  /// The schedulable slice of this row, for the domain scheduler. `None`
  /// until a first delivery has been scheduled (i.e. while pending).
  pub fn schedule(&self) -> Option<DeliverySchedule> {
    self.next_delivery.map(|next_delivery| DeliverySchedule {
      next_delivery,
      skipped: self.skipped_deliveries.clone(),
    })
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubscriptionItem {
  pub id: Uuid,
  pub subscription_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
}
