// src/lib.rs

//! KibbleDrop domain layer.
//!
//! The pure, IO-free half of the storefront:
//!  - the order/payment status machine with its legal transitions,
//!  - subscription frequencies and the delivery-date scheduler,
//!  - the unified payment-gateway interface (one trait, one normalized
//!    event shape, one status mapping) implemented by the server's
//!    Stripe and TradeSafe adapters.
//!
//! Keeping this crate free of web/database dependencies means every rule a
//! webhook or an admin action can exercise is testable without a server.

pub mod error;
pub mod order;
pub mod payment;
pub mod schedule;

// --- Re-exports for the Public API ---

pub use crate::error::{DomainError, DomainResult};
pub use crate::order::OrderStatus;
pub use crate::payment::{
  CheckoutRequest, CheckoutSession, EventReference, GatewayEvent, PaymentGateway, PaymentOutcome,
  SubscriptionCharge,
};
pub use crate::schedule::{next_delivery_after, DeliverySchedule, Frequency, SubscriptionStatus};
