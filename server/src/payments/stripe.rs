// kibbledrop_server/src/payments/stripe.rs

//! Stripe Checkout adapter.
//!
//! Checkout Sessions are created with inline `price_data` (one-time mode for
//! plain orders, subscription mode with a recurring interval derived from
//! the delivery frequency). The local order/subscription ids ride along in
//! session metadata and come back on webhook events.

use async_trait::async_trait;
use chrono::Utc;
use kibbledrop_core::{
  CheckoutRequest, CheckoutSession, DomainError, DomainResult, EventReference, Frequency, GatewayEvent,
  PaymentGateway, PaymentOutcome,
};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
/// Webhook timestamps older than this are treated as replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct StripeGateway {
  secret_key: String,
  webhook_secret: String,
  http: reqwest::Client,
}

impl StripeGateway {
  pub fn new(secret_key: String, webhook_secret: String) -> Self {
    Self {
      secret_key,
      webhook_secret,
      http: reqwest::Client::new(),
    }
  }

  /// Stripe's recurring interval for a delivery frequency.
  fn recurring_interval(frequency: Frequency) -> (&'static str, u32) {
    match frequency {
      Frequency::Weekly => ("week", 1),
      Frequency::BiWeekly => ("week", 2),
      Frequency::TriWeekly => ("week", 3),
      Frequency::Monthly | Frequency::Custom => ("month", 1),
    }
  }

  /// Parses the `Stripe-Signature` header: `t=<unix>,v1=<hex>[,v1=...]`.
  fn parse_signature_header(header: &str) -> DomainResult<(i64, Vec<String>)> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<String> = Vec::new();
    for part in header.split(',') {
      match part.split_once('=') {
        Some(("t", value)) => {
          timestamp = value.parse::<i64>().ok();
        }
        Some(("v1", value)) => signatures.push(value.to_string()),
        _ => {}
      }
    }
    let timestamp =
      timestamp.ok_or_else(|| DomainError::SignatureInvalid("Missing timestamp in signature header.".to_string()))?;
    if signatures.is_empty() {
      return Err(DomainError::SignatureInvalid(
        "Missing v1 signature in signature header.".to_string(),
      ));
    }
    Ok((timestamp, signatures))
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  fn name(&self) -> &'static str {
    "stripe"
  }

  fn signature_header(&self) -> &'static str {
    "stripe-signature"
  }

  #[instrument(name = "stripe::create_checkout", skip(self, req), fields(order_id = %req.order_id))]
  async fn create_checkout(&self, req: &CheckoutRequest) -> DomainResult<CheckoutSession> {
    let mut params: Vec<(String, String)> = vec![
      ("success_url".into(), req.success_url.clone()),
      ("cancel_url".into(), req.cancel_url.clone()),
      ("customer_email".into(), req.customer_email.clone()),
      ("line_items[0][quantity]".into(), "1".into()),
      ("line_items[0][price_data][currency]".into(), req.currency.clone()),
      (
        "line_items[0][price_data][unit_amount]".into(),
        req.amount_cents.to_string(),
      ),
      (
        "line_items[0][price_data][product_data][name]".into(),
        format!("KibbleDrop order {}", req.order_id),
      ),
      ("metadata[order_id]".into(), req.order_id.to_string()),
    ];

    match &req.subscription {
      Some(charge) => {
        let (interval, count) = Self::recurring_interval(charge.frequency);
        params.push(("mode".into(), "subscription".into()));
        params.push(("line_items[0][price_data][recurring][interval]".into(), interval.into()));
        params.push((
          "line_items[0][price_data][recurring][interval_count]".into(),
          count.to_string(),
        ));
        params.push(("metadata[subscription_id]".into(), charge.subscription_id.to_string()));
      }
      None => params.push(("mode".into(), "payment".into())),
    }

    let response = self
      .http
      .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
      .bearer_auth(&self.secret_key)
      .form(&params)
      .send()
      .await
      .map_err(DomainError::gateway)?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      warn!(%status, "Stripe checkout session creation failed.");
      return Err(DomainError::gateway(anyhow::anyhow!(
        "Stripe returned {}: {}",
        status,
        body
      )));
    }

    let body: Value = response.json().await.map_err(DomainError::gateway)?;
    let session_id = body["id"]
      .as_str()
      .ok_or_else(|| DomainError::MalformedEvent("Stripe session response missing id.".to_string()))?
      .to_string();
    let redirect_url = body["url"].as_str().map(String::from);

    info!(session_id = %session_id, "Stripe checkout session created.");
    Ok(CheckoutSession {
      provider: self.name().to_string(),
      session_id,
      redirect_url,
      client_data: None,
    })
  }

  fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> DomainResult<()> {
    let header =
      signature.ok_or_else(|| DomainError::SignatureInvalid("Missing Stripe-Signature header.".to_string()))?;
    let (timestamp, signatures) = Self::parse_signature_header(header)?;

    let age = Utc::now().timestamp() - timestamp;
    if age.abs() > SIGNATURE_TOLERANCE_SECS {
      return Err(DomainError::SignatureInvalid(
        "Signature timestamp outside tolerance.".to_string(),
      ));
    }

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    if signatures
      .iter()
      .any(|sig| super::verify_hex_hmac(&self.webhook_secret, signed_payload.as_bytes(), sig).is_ok())
    {
      Ok(())
    } else {
      Err(DomainError::SignatureInvalid(
        "No v1 signature matched the payload.".to_string(),
      ))
    }
  }

  fn parse_event(&self, payload: &[u8]) -> DomainResult<Option<GatewayEvent>> {
    let body: Value = serde_json::from_slice(payload)
      .map_err(|e| DomainError::MalformedEvent(format!("Invalid Stripe event JSON: {}", e)))?;
    let event_type = body["type"]
      .as_str()
      .ok_or_else(|| DomainError::MalformedEvent("Stripe event missing type.".to_string()))?;
    let event_id = body["id"].as_str().map(String::from);
    let object = &body["data"]["object"];

    let outcome = match event_type {
      "checkout.session.completed" | "checkout.session.async_payment_succeeded" => PaymentOutcome::Succeeded,
      "checkout.session.expired" => PaymentOutcome::Canceled,
      "checkout.session.async_payment_failed" | "invoice.payment_failed" => PaymentOutcome::Failed,
      "customer.subscription.deleted" => PaymentOutcome::Canceled,
      other => {
        info!(event_type = other, "Ignoring unhandled Stripe event type.");
        return Ok(None);
      }
    };

    let metadata = &object["metadata"];
    let reference = if let Some(order_id) = metadata["order_id"].as_str().and_then(|s| Uuid::parse_str(s).ok()) {
      EventReference::Order(order_id)
    } else if let Some(sub_id) = metadata["subscription_id"]
      .as_str()
      .and_then(|s| Uuid::parse_str(s).ok())
    {
      EventReference::Subscription(sub_id)
    } else if let Some(external) = object["subscription"].as_str().or_else(|| object["id"].as_str()) {
      EventReference::External(external.to_string())
    } else {
      return Err(DomainError::MalformedEvent(
        "Stripe event carries no usable reference.".to_string(),
      ));
    };

    Ok(Some(GatewayEvent {
      event_id,
      reference,
      outcome,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gateway() -> StripeGateway {
    StripeGateway::new("sk_test_xxx".to_string(), "whsec_test123secret456".to_string())
  }

  fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    format!(
      "t={},v1={}",
      timestamp,
      super::super::hmac_sha256_hex(secret, signed_payload.as_bytes())
    )
  }

  #[test]
  fn valid_signature_is_accepted() {
    let gw = gateway();
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = sign(payload, "whsec_test123secret456", Utc::now().timestamp());
    assert!(gw.verify_webhook(payload, Some(&header)).is_ok());
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let gw = gateway();
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = sign(payload, "wrong_secret", Utc::now().timestamp());
    assert!(gw.verify_webhook(payload, Some(&header)).is_err());
  }

  #[test]
  fn modified_payload_is_rejected() {
    let gw = gateway();
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = sign(payload, "whsec_test123secret456", Utc::now().timestamp());
    let tampered = br#"{"type":"checkout.session.completed","hacked":true}"#;
    assert!(gw.verify_webhook(tampered, Some(&header)).is_err());
  }

  #[test]
  fn old_timestamp_is_rejected() {
    let gw = gateway();
    let payload = br#"{"type":"checkout.session.completed"}"#;
    // 10 minutes old, beyond the 5-minute tolerance.
    let header = sign(payload, "whsec_test123secret456", Utc::now().timestamp() - 600);
    assert!(gw.verify_webhook(payload, Some(&header)).is_err());
  }

  #[test]
  fn missing_header_pieces_error() {
    let gw = gateway();
    let payload = br#"{}"#;
    assert!(gw.verify_webhook(payload, None).is_err());
    assert!(gw.verify_webhook(payload, Some("t=1234567890")).is_err());
    assert!(gw.verify_webhook(payload, Some("v1=deadbeef")).is_err());
    assert!(gw.verify_webhook(payload, Some("garbage")).is_err());
  }

  #[test]
  fn completed_session_event_parses_to_order_success() {
    let gw = gateway();
    let order_id = Uuid::new_v4();
    let payload = serde_json::json!({
      "id": "evt_1",
      "type": "checkout.session.completed",
      "data": { "object": { "id": "cs_1", "metadata": { "order_id": order_id.to_string() } } }
    });
    let event = gw.parse_event(payload.to_string().as_bytes()).unwrap().unwrap();
    assert_eq!(event.event_id.as_deref(), Some("evt_1"));
    assert_eq!(event.outcome, PaymentOutcome::Succeeded);
    assert_eq!(event.reference, EventReference::Order(order_id));
  }

  #[test]
  fn subscription_deleted_falls_back_to_external_reference() {
    let gw = gateway();
    let payload = serde_json::json!({
      "id": "evt_2",
      "type": "customer.subscription.deleted",
      "data": { "object": { "id": "sub_abc", "metadata": {} } }
    });
    let event = gw.parse_event(payload.to_string().as_bytes()).unwrap().unwrap();
    assert_eq!(event.outcome, PaymentOutcome::Canceled);
    assert_eq!(event.reference, EventReference::External("sub_abc".to_string()));
  }

  #[test]
  fn unhandled_event_type_is_skipped() {
    let gw = gateway();
    let payload = br#"{"id":"evt_3","type":"payment_intent.created","data":{"object":{}}}"#;
    assert!(gw.parse_event(payload).unwrap().is_none());
  }

  #[test]
  fn recurring_intervals_follow_frequency() {
    assert_eq!(StripeGateway::recurring_interval(Frequency::Weekly), ("week", 1));
    assert_eq!(StripeGateway::recurring_interval(Frequency::BiWeekly), ("week", 2));
    assert_eq!(StripeGateway::recurring_interval(Frequency::TriWeekly), ("week", 3));
    assert_eq!(StripeGateway::recurring_interval(Frequency::Monthly), ("month", 1));
  }
}
