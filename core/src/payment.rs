// kibbledrop_core/src/payment.rs

//! The unified payment-gateway interface.
//!
//! The storefront talks to three external gateways (Stripe checkout, and two
//! TradeSafe integration styles). Each adapter implements [`PaymentGateway`]
//! so that checkout creation, webhook-signature verification, and status
//! normalization happen behind one seam; provider-specific status strings
//! never leak past `parse_event`.

use crate::error::DomainResult;
use crate::order::OrderStatus;
use crate::schedule::Frequency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurring-charge details attached to a checkout when the order funds a
/// subscription rather than a one-time purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCharge {
  pub subscription_id: Uuid,
  pub frequency: Frequency,
}

/// Everything an adapter needs to open an external payment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
  pub order_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub customer_email: String,
  pub success_url: String,
  pub cancel_url: String,
  pub subscription: Option<SubscriptionCharge>,
}

/// The external session an adapter created: where to send the customer and
/// what to persist on the order row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
  pub provider: String,
  pub session_id: String,
  pub redirect_url: Option<String>,
  pub client_data: Option<String>,
}

/// Gateway-reported payment state, normalized once per adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
  Succeeded,
  Failed,
  Canceled,
  Pending,
}

impl PaymentOutcome {
  /// The single place where gateway outcomes map onto the local order enum.
  pub fn order_status(&self) -> OrderStatus {
    match self {
      PaymentOutcome::Succeeded => OrderStatus::Paid,
      PaymentOutcome::Failed => OrderStatus::Failed,
      PaymentOutcome::Canceled => OrderStatus::Canceled,
      PaymentOutcome::Pending => OrderStatus::PaymentPending,
    }
  }
}

/// What a webhook refers to. Adapters embed the local order or subscription
/// id in the session metadata at checkout time and read it back here; when a
/// payload carries only the gateway's own reference, `External` lets the
/// caller resolve it against the stored `payment_reference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventReference {
  Order(Uuid),
  Subscription(Uuid),
  External(String),
}

/// A webhook payload reduced to what the order/subscription services need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
  /// Gateway-assigned event id, used for duplicate-delivery suppression.
  pub event_id: Option<String>,
  pub reference: EventReference,
  pub outcome: PaymentOutcome,
}

/// One concrete adapter per provider. Signature verification is mandatory
/// for every adapter in every environment.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn name(&self) -> &'static str;

  /// Opens an external payment session for the given order.
  async fn create_checkout(&self, req: &CheckoutRequest) -> DomainResult<CheckoutSession>;

  /// Header carrying this provider's webhook signature.
  fn signature_header(&self) -> &'static str;

  /// Verifies the webhook signature over the raw payload bytes.
  fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> DomainResult<()>;

  /// Reduces a verified payload to a normalized [`GatewayEvent`].
  ///
  /// `Ok(None)` means the payload is well-formed but reports an event type
  /// this system does not act on; the receiver acknowledges it so the
  /// gateway stops retrying.
  fn parse_event(&self, payload: &[u8]) -> DomainResult<Option<GatewayEvent>>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outcome_maps_to_order_status_once() {
    assert_eq!(PaymentOutcome::Succeeded.order_status(), OrderStatus::Paid);
    assert_eq!(PaymentOutcome::Failed.order_status(), OrderStatus::Failed);
    assert_eq!(PaymentOutcome::Canceled.order_status(), OrderStatus::Canceled);
    assert_eq!(PaymentOutcome::Pending.order_status(), OrderStatus::PaymentPending);
  }

  #[test]
  fn every_outcome_is_reachable_from_payment_pending() {
    for outcome in [
      PaymentOutcome::Succeeded,
      PaymentOutcome::Failed,
      PaymentOutcome::Canceled,
      PaymentOutcome::Pending,
    ] {
      assert!(OrderStatus::PaymentPending.can_transition_to(outcome.order_status()));
    }
  }
}
