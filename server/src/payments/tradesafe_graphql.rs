// kibbledrop_server/src/payments/tradesafe_graphql.rs

//! TradeSafe adapter, GraphQL integration.
//!
//! Checkout is two sequential calls against the GraphQL endpoint: a
//! `transactionCreate` mutation, then a `checkoutLink` query for the hosted
//! payment URL. Webhook payloads nest the transaction under
//! `data.transaction`; the signature scheme is the same hex HMAC as the
//! REST integration and is required in every environment.

use async_trait::async_trait;
use kibbledrop_core::{
  CheckoutRequest, CheckoutSession, DomainError, DomainResult, EventReference, GatewayEvent, PaymentGateway,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const TRANSACTION_CREATE_MUTATION: &str = "mutation transactionCreate($input: TransactionInput!) {\
 transactionCreate(input: $input) { id } }";

const CHECKOUT_LINK_QUERY: &str = "query checkoutLink($transactionId: ID!) {\
 checkoutLink(transactionId: $transactionId) }";

pub struct TradeSafeGraphQlGateway {
  endpoint: String,
  api_token: String,
  webhook_secret: String,
  http: reqwest::Client,
}

impl TradeSafeGraphQlGateway {
  pub fn new(endpoint: String, api_token: String, webhook_secret: String) -> Self {
    Self {
      endpoint,
      api_token,
      webhook_secret,
      http: reqwest::Client::new(),
    }
  }

  async fn execute(&self, query: &str, variables: Value) -> DomainResult<Value> {
    let response = self
      .http
      .post(&self.endpoint)
      .bearer_auth(&self.api_token)
      .json(&json!({ "query": query, "variables": variables }))
      .send()
      .await
      .map_err(DomainError::gateway)?;

    if !response.status().is_success() {
      let status = response.status();
      warn!(%status, "TradeSafe GraphQL request failed.");
      return Err(DomainError::gateway(anyhow::anyhow!(
        "TradeSafe GraphQL returned {}",
        status
      )));
    }

    let body: Value = response.json().await.map_err(DomainError::gateway)?;
    if let Some(errors) = body.get("errors").filter(|e| !e.as_array().map_or(true, Vec::is_empty)) {
      return Err(DomainError::gateway(anyhow::anyhow!(
        "TradeSafe GraphQL errors: {}",
        errors
      )));
    }
    Ok(body)
  }
}

#[async_trait]
impl PaymentGateway for TradeSafeGraphQlGateway {
  fn name(&self) -> &'static str {
    "tradesafe-graphql"
  }

  fn signature_header(&self) -> &'static str {
    "x-tradesafe-signature"
  }

  #[instrument(name = "tradesafe_graphql::create_checkout", skip(self, req), fields(order_id = %req.order_id))]
  async fn create_checkout(&self, req: &CheckoutRequest) -> DomainResult<CheckoutSession> {
    let create_variables = json!({
      "input": {
        "reference": req.order_id.to_string(),
        "valueCents": req.amount_cents,
        "currency": req.currency.to_uppercase(),
        "buyerEmail": req.customer_email,
      }
    });
    let created = self.execute(TRANSACTION_CREATE_MUTATION, create_variables).await?;
    let transaction_id = created["data"]["transactionCreate"]["id"]
      .as_str()
      .ok_or_else(|| DomainError::MalformedEvent("transactionCreate response missing id.".to_string()))?
      .to_string();

    let link = self
      .execute(CHECKOUT_LINK_QUERY, json!({ "transactionId": transaction_id }))
      .await?;
    let redirect_url = link["data"]["checkoutLink"].as_str().map(String::from);

    info!(transaction_id = %transaction_id, "TradeSafe GraphQL transaction created.");
    Ok(CheckoutSession {
      provider: self.name().to_string(),
      session_id: transaction_id,
      redirect_url,
      client_data: None,
    })
  }

  fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> DomainResult<()> {
    let signature =
      signature.ok_or_else(|| DomainError::SignatureInvalid("Missing X-TradeSafe-Signature header.".to_string()))?;
    super::verify_hex_hmac(&self.webhook_secret, payload, signature)
  }

  fn parse_event(&self, payload: &[u8]) -> DomainResult<Option<GatewayEvent>> {
    let body: Value = serde_json::from_slice(payload)
      .map_err(|e| DomainError::MalformedEvent(format!("Invalid TradeSafe GraphQL webhook JSON: {}", e)))?;

    let transaction = &body["data"]["transaction"];
    if transaction.is_null() {
      return Err(DomainError::MalformedEvent(
        "Webhook payload missing data.transaction.".to_string(),
      ));
    }
    let state = transaction["state"]
      .as_str()
      .ok_or_else(|| DomainError::MalformedEvent("Webhook transaction missing state.".to_string()))?;
    let transaction_id = transaction["id"]
      .as_str()
      .ok_or_else(|| DomainError::MalformedEvent("Webhook transaction missing id.".to_string()))?;

    let reference = match transaction["reference"].as_str().and_then(|r| Uuid::parse_str(r).ok()) {
      Some(order_id) => EventReference::Order(order_id),
      None => EventReference::External(transaction_id.to_string()),
    };

    Ok(Some(GatewayEvent {
      event_id: body["id"].as_str().map(String::from),
      reference,
      outcome: super::map_tradesafe_state(state),
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use kibbledrop_core::PaymentOutcome;

  fn gateway() -> TradeSafeGraphQlGateway {
    TradeSafeGraphQlGateway::new(
      "https://api.example/graphql".to_string(),
      "token".to_string(),
      "gql_secret".to_string(),
    )
  }

  #[test]
  fn signature_is_required_even_outside_production() {
    let gw = gateway();
    let payload = br#"{"data":{"transaction":{"id":"tx_1","state":"COMPLETE"}}}"#;
    assert!(gw.verify_webhook(payload, None).is_err());
    let sig = super::super::hmac_sha256_hex("gql_secret", payload);
    assert!(gw.verify_webhook(payload, Some(&sig)).is_ok());
  }

  #[test]
  fn nested_transaction_event_parses() {
    let gw = gateway();
    let order_id = Uuid::new_v4();
    let payload = json!({
      "id": "gql_evt_1",
      "data": { "transaction": { "id": "tx_1", "reference": order_id.to_string(), "state": "FUNDS_RECEIVED" } }
    });
    let event = gw.parse_event(payload.to_string().as_bytes()).unwrap().unwrap();
    assert_eq!(event.outcome, PaymentOutcome::Succeeded);
    assert_eq!(event.reference, EventReference::Order(order_id));
    assert_eq!(event.event_id.as_deref(), Some("gql_evt_1"));
  }

  #[test]
  fn missing_transaction_block_errors() {
    let gw = gateway();
    assert!(gw.parse_event(br#"{"data":{}}"#).is_err());
    assert!(gw.parse_event(br#"{"data":{"transaction":{"id":"tx_1"}}}"#).is_err());
  }

  #[test]
  fn both_tradesafe_styles_share_state_semantics() {
    // The REST and GraphQL integrations must never disagree on an outcome.
    let gw = gateway();
    let payload = json!({
      "data": { "transaction": { "id": "tx_2", "state": "CANCELLED" } }
    });
    let event = gw.parse_event(payload.to_string().as_bytes()).unwrap().unwrap();
    assert_eq!(event.outcome, PaymentOutcome::Canceled);
  }
}
