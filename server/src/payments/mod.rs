// kibbledrop_server/src/payments/mod.rs

//! Concrete payment-gateway adapters behind the domain crate's
//! [`PaymentGateway`] trait, and the registry that resolves a URL path
//! segment (`/checkout/{provider}`, `/webhooks/{provider}`) to an adapter.
//!
//! Status semantics are normalized exactly once, inside each adapter's
//! `parse_event`; nothing downstream ever sees a provider status string.

pub mod stripe;
pub mod tradesafe;
pub mod tradesafe_graphql;

use crate::config::AppConfig;
use hmac::{Hmac, Mac};
use kibbledrop_core::{DomainError, DomainResult, PaymentGateway, PaymentOutcome};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub(crate) fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
  mac.update(payload);
  hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex-encoded HMAC-SHA256 signature.
pub(crate) fn verify_hex_hmac(secret: &str, payload: &[u8], signature_hex: &str) -> DomainResult<()> {
  let expected =
    hex::decode(signature_hex).map_err(|_| DomainError::SignatureInvalid("Signature is not valid hex.".to_string()))?;
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
  mac.update(payload);
  mac
    .verify_slice(&expected)
    .map_err(|_| DomainError::SignatureInvalid("Signature does not match payload.".to_string()))
}

/// Both TradeSafe integrations report the same transaction states; map them
/// in one place so the two adapters cannot drift apart again.
pub(crate) fn map_tradesafe_state(state: &str) -> PaymentOutcome {
  match state {
    "FUNDS_RECEIVED" | "FUNDS_DEPOSITED" | "COMPLETE" | "COMPLETED" => PaymentOutcome::Succeeded,
    "CANCELED" | "CANCELLED" => PaymentOutcome::Canceled,
    "DECLINED" | "FAILED" => PaymentOutcome::Failed,
    _ => PaymentOutcome::Pending,
  }
}

pub struct GatewayRegistry {
  gateways: HashMap<&'static str, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
  pub fn from_config(config: &AppConfig) -> Self {
    let mut gateways: HashMap<&'static str, Arc<dyn PaymentGateway>> = HashMap::new();

    let stripe = Arc::new(stripe::StripeGateway::new(
      config.stripe_secret_key.clone(),
      config.stripe_webhook_secret.clone(),
    ));
    gateways.insert(stripe.name(), stripe as Arc<dyn PaymentGateway>);

    let tradesafe = Arc::new(tradesafe::TradeSafeGateway::new(
      config.tradesafe_api_base.clone(),
      config.tradesafe_api_token.clone(),
      config.tradesafe_webhook_secret.clone(),
    ));
    gateways.insert(tradesafe.name(), tradesafe as Arc<dyn PaymentGateway>);

    let tradesafe_graphql = Arc::new(tradesafe_graphql::TradeSafeGraphQlGateway::new(
      config.tradesafe_graphql_endpoint.clone(),
      config.tradesafe_graphql_token.clone(),
      config.tradesafe_graphql_webhook_secret.clone(),
    ));
    gateways.insert(tradesafe_graphql.name(), tradesafe_graphql as Arc<dyn PaymentGateway>);

    tracing::info!(providers = ?gateways.keys().collect::<Vec<_>>(), "Payment gateways registered.");
    Self { gateways }
  }

  pub fn resolve(&self, name: &str) -> Option<Arc<dyn PaymentGateway>> {
    self.gateways.get(name).cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hex_hmac_round_trip() {
    let sig = hmac_sha256_hex("secret", b"payload");
    assert!(verify_hex_hmac("secret", b"payload", &sig).is_ok());
    assert!(verify_hex_hmac("secret", b"tampered", &sig).is_err());
    assert!(verify_hex_hmac("other", b"payload", &sig).is_err());
  }

  #[test]
  fn non_hex_signature_is_rejected() {
    assert!(matches!(
      verify_hex_hmac("secret", b"payload", "zz-not-hex"),
      Err(DomainError::SignatureInvalid(_))
    ));
  }

  #[test]
  fn tradesafe_state_normalization() {
    assert_eq!(map_tradesafe_state("FUNDS_RECEIVED"), PaymentOutcome::Succeeded);
    assert_eq!(map_tradesafe_state("COMPLETE"), PaymentOutcome::Succeeded);
    // Both historical spellings collapse onto one outcome.
    assert_eq!(map_tradesafe_state("CANCELED"), PaymentOutcome::Canceled);
    assert_eq!(map_tradesafe_state("CANCELLED"), PaymentOutcome::Canceled);
    assert_eq!(map_tradesafe_state("DECLINED"), PaymentOutcome::Failed);
    assert_eq!(map_tradesafe_state("CREATED"), PaymentOutcome::Pending);
  }
}
