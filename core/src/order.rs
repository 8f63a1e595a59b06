// kibbledrop_core/src/order.rs

//! The order/payment status machine.
//!
//! Statuses are stored as plain strings in the database; this module owns the
//! canonical spellings, the alias handling, and the legal transitions. All
//! three payment gateways funnel through the same machine, so a webhook can
//! never push an order somewhere a direct API call could not.

use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  PaymentPending,
  Processing,
  Paid,
  Shipped,
  Completed,
  Canceled,
  Failed,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::PaymentPending => "payment_pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Paid => "paid",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Completed => "completed",
      OrderStatus::Canceled => "canceled",
      OrderStatus::Failed => "failed",
    }
  }

  /// Terminal statuses absorb: nothing moves an order out of them.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      OrderStatus::Completed | OrderStatus::Canceled | OrderStatus::Failed
    )
  }

  /// Whether `next` is a legal successor of `self`.
  ///
  /// Re-applying the current status is always allowed so that a redelivered
  /// webhook that slips past the event ledger is a harmless no-op.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    if *self == next {
      return true;
    }
    if self.is_terminal() {
      return false;
    }
    // Cancellation and failure are reachable from any non-terminal state.
    if matches!(next, OrderStatus::Canceled | OrderStatus::Failed) {
      return true;
    }
    match self {
      OrderStatus::Pending => matches!(next, OrderStatus::PaymentPending | OrderStatus::Paid),
      OrderStatus::PaymentPending => matches!(next, OrderStatus::Paid | OrderStatus::Processing),
      OrderStatus::Paid => matches!(next, OrderStatus::Processing | OrderStatus::Shipped),
      OrderStatus::Processing => matches!(next, OrderStatus::Shipped | OrderStatus::Completed),
      OrderStatus::Shipped => matches!(next, OrderStatus::Completed),
      _ => false,
    }
  }

  /// Applies a transition, rejecting anything the lattice does not allow.
  pub fn transition(&self, next: OrderStatus) -> DomainResult<OrderStatus> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(DomainError::InvalidTransition {
        from: self.as_str().to_string(),
        to: next.as_str().to_string(),
      })
    }
  }
}

impl FromStr for OrderStatus {
  type Err = DomainError;

  fn from_str(s: &str) -> DomainResult<Self> {
    match s {
      "pending" => Ok(OrderStatus::Pending),
      // "payment_due" is the spelling an earlier schema used.
      "payment_pending" | "payment_due" => Ok(OrderStatus::PaymentPending),
      "processing" => Ok(OrderStatus::Processing),
      "paid" => Ok(OrderStatus::Paid),
      "shipped" => Ok(OrderStatus::Shipped),
      "completed" => Ok(OrderStatus::Completed),
      // Both spellings appear in historical gateway payloads.
      "canceled" | "cancelled" => Ok(OrderStatus::Canceled),
      "failed" => Ok(OrderStatus::Failed),
      other => Err(DomainError::UnknownStatus(other.to_string())),
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_string_round_trip() {
    for status in [
      OrderStatus::Pending,
      OrderStatus::PaymentPending,
      OrderStatus::Processing,
      OrderStatus::Paid,
      OrderStatus::Shipped,
      OrderStatus::Completed,
      OrderStatus::Canceled,
      OrderStatus::Failed,
    ] {
      assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
    }
  }

  #[test]
  fn accepts_legacy_spellings() {
    assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
    assert_eq!(
      "payment_due".parse::<OrderStatus>().unwrap(),
      OrderStatus::PaymentPending
    );
  }

  #[test]
  fn unknown_status_is_rejected() {
    assert!(matches!(
      "refunded".parse::<OrderStatus>(),
      Err(DomainError::UnknownStatus(_))
    ));
  }

  #[test]
  fn happy_path_transitions() {
    let status = OrderStatus::Pending
      .transition(OrderStatus::PaymentPending)
      .unwrap()
      .transition(OrderStatus::Paid)
      .unwrap()
      .transition(OrderStatus::Shipped)
      .unwrap()
      .transition(OrderStatus::Completed)
      .unwrap();
    assert_eq!(status, OrderStatus::Completed);
  }

  #[test]
  fn terminal_states_absorb() {
    for terminal in [OrderStatus::Completed, OrderStatus::Canceled, OrderStatus::Failed] {
      assert!(terminal.is_terminal());
      assert!(terminal.transition(OrderStatus::Pending).is_err());
      assert!(terminal.transition(OrderStatus::Paid).is_err());
      // Re-application of the same status stays a no-op.
      assert_eq!(terminal.transition(terminal).unwrap(), terminal);
    }
  }

  #[test]
  fn cancel_and_fail_reachable_from_any_pre_terminal_state() {
    for status in [
      OrderStatus::Pending,
      OrderStatus::PaymentPending,
      OrderStatus::Paid,
      OrderStatus::Processing,
      OrderStatus::Shipped,
    ] {
      assert!(status.can_transition_to(OrderStatus::Canceled));
      assert!(status.can_transition_to(OrderStatus::Failed));
    }
  }

  #[test]
  fn no_backwards_movement() {
    assert!(OrderStatus::Paid.transition(OrderStatus::Pending).is_err());
    assert!(OrderStatus::Shipped.transition(OrderStatus::PaymentPending).is_err());
  }
}
