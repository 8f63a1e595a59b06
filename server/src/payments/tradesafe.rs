// kibbledrop_server/src/payments/tradesafe.rs

//! TradeSafe adapter, REST-style integration.
//!
//! Transactions are created with the local order id as the `reference`
//! field, so webhook payloads can be resolved without a lookup table.
//! Webhooks are signed with a hex HMAC-SHA256 of the raw body in
//! `X-TradeSafe-Signature`.

use async_trait::async_trait;
use kibbledrop_core::{
  CheckoutRequest, CheckoutSession, DomainError, DomainResult, EventReference, GatewayEvent, PaymentGateway,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct TradeSafeGateway {
  api_base: String,
  api_token: String,
  webhook_secret: String,
  http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateTransactionResponse {
  id: String,
  #[serde(rename = "redirectUrl")]
  redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
  #[serde(rename = "eventId")]
  event_id: Option<String>,
  #[serde(rename = "transactionId")]
  transaction_id: String,
  reference: Option<String>,
  state: String,
}

impl TradeSafeGateway {
  pub fn new(api_base: String, api_token: String, webhook_secret: String) -> Self {
    Self {
      api_base,
      api_token,
      webhook_secret,
      http: reqwest::Client::new(),
    }
  }
}

#[async_trait]
impl PaymentGateway for TradeSafeGateway {
  fn name(&self) -> &'static str {
    "tradesafe"
  }

  fn signature_header(&self) -> &'static str {
    "x-tradesafe-signature"
  }

  #[instrument(name = "tradesafe::create_checkout", skip(self, req), fields(order_id = %req.order_id))]
  async fn create_checkout(&self, req: &CheckoutRequest) -> DomainResult<CheckoutSession> {
    let body = json!({
      "reference": req.order_id.to_string(),
      "valueCents": req.amount_cents,
      "currency": req.currency.to_uppercase(),
      "buyerEmail": req.customer_email,
      "successUrl": req.success_url,
      "cancelUrl": req.cancel_url,
    });

    let response = self
      .http
      .post(format!("{}/transactions", self.api_base))
      .bearer_auth(&self.api_token)
      .json(&body)
      .send()
      .await
      .map_err(DomainError::gateway)?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      warn!(%status, "TradeSafe transaction creation failed.");
      return Err(DomainError::gateway(anyhow::anyhow!(
        "TradeSafe returned {}: {}",
        status,
        text
      )));
    }

    let created: CreateTransactionResponse = response.json().await.map_err(DomainError::gateway)?;
    info!(transaction_id = %created.id, "TradeSafe transaction created.");
    Ok(CheckoutSession {
      provider: self.name().to_string(),
      session_id: created.id,
      redirect_url: created.redirect_url,
      client_data: None,
    })
  }

  fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> DomainResult<()> {
    let signature =
      signature.ok_or_else(|| DomainError::SignatureInvalid("Missing X-TradeSafe-Signature header.".to_string()))?;
    super::verify_hex_hmac(&self.webhook_secret, payload, signature)
  }

  fn parse_event(&self, payload: &[u8]) -> DomainResult<Option<GatewayEvent>> {
    let parsed: WebhookPayload = serde_json::from_slice(payload)
      .map_err(|e| DomainError::MalformedEvent(format!("Invalid TradeSafe webhook JSON: {}", e)))?;

    let reference = match parsed.reference.as_deref().and_then(|r| Uuid::parse_str(r).ok()) {
      Some(order_id) => EventReference::Order(order_id),
      None => EventReference::External(parsed.transaction_id.clone()),
    };

    Ok(Some(GatewayEvent {
      event_id: parsed.event_id,
      reference,
      outcome: super::map_tradesafe_state(&parsed.state),
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use kibbledrop_core::PaymentOutcome;

  fn gateway() -> TradeSafeGateway {
    TradeSafeGateway::new(
      "https://api.example".to_string(),
      "token".to_string(),
      "ts_secret".to_string(),
    )
  }

  #[test]
  fn signature_over_raw_body() {
    let gw = gateway();
    let payload = br#"{"transactionId":"tx_1","state":"FUNDS_RECEIVED"}"#;
    let sig = super::super::hmac_sha256_hex("ts_secret", payload);
    assert!(gw.verify_webhook(payload, Some(&sig)).is_ok());
    assert!(gw.verify_webhook(payload, Some("00ff00ff")).is_err());
    assert!(gw.verify_webhook(payload, None).is_err());
  }

  #[test]
  fn funds_received_event_resolves_order_reference() {
    let gw = gateway();
    let order_id = Uuid::new_v4();
    let payload = json!({
      "eventId": "ts_evt_1",
      "transactionId": "tx_1",
      "reference": order_id.to_string(),
      "state": "FUNDS_RECEIVED"
    });
    let event = gw.parse_event(payload.to_string().as_bytes()).unwrap().unwrap();
    assert_eq!(event.outcome, PaymentOutcome::Succeeded);
    assert_eq!(event.reference, EventReference::Order(order_id));
    assert_eq!(event.event_id.as_deref(), Some("ts_evt_1"));
  }

  #[test]
  fn non_uuid_reference_falls_back_to_transaction_id() {
    let gw = gateway();
    let payload = br#"{"transactionId":"tx_9","reference":"legacy-ref","state":"DECLINED"}"#;
    let event = gw.parse_event(payload).unwrap().unwrap();
    assert_eq!(event.outcome, PaymentOutcome::Failed);
    assert_eq!(event.reference, EventReference::External("tx_9".to_string()));
  }

  #[test]
  fn malformed_payload_errors() {
    let gw = gateway();
    assert!(gw.parse_event(b"not json").is_err());
    assert!(gw.parse_event(br#"{"state":"COMPLETE"}"#).is_err());
  }
}
