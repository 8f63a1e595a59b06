// kibbledrop_core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
  #[error("Invalid order status transition: {from} -> {to}")]
  InvalidTransition { from: String, to: String },

  #[error("Unknown order status: {0}")]
  UnknownStatus(String),

  #[error("Unknown subscription status: {0}")]
  UnknownSubscriptionStatus(String),

  #[error("Invalid subscription frequency: {0}")]
  InvalidFrequency(String),

  #[error("Webhook signature rejected: {0}")]
  SignatureInvalid(String),

  #[error("Malformed gateway event: {0}")]
  MalformedEvent(String),

  #[error("Payment gateway call failed. Source: {source}")]
  Gateway {
    #[source]
    source: AnyhowError,
  },
}

impl DomainError {
  /// Wraps any error from a gateway adapter's transport layer.
  pub fn gateway(err: impl Into<AnyhowError>) -> Self {
    DomainError::Gateway { source: err.into() }
  }
}

// Foreign errors bubbling out of adapter code collapse into Gateway unless
// the adapter already produced a DomainError.
impl From<AnyhowError> for DomainError {
  fn from(err: AnyhowError) -> Self {
    DomainError::Gateway { source: err }
  }
}

pub type DomainResult<T, E = DomainError> = std::result::Result<T, E>;
