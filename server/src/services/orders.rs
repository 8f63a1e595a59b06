// kibbledrop_server/src/services/orders.rs

//! Order lifecycle: creation from the cart, checkout initiation against a
//! payment gateway, webhook-driven status advancement, and the admin
//! surface. Order + item rows are written in one transaction; status
//! changes all pass through the domain status machine.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderItem};
use crate::services::{cart, mailer, subscriptions};
use crate::state::AppState;
use kibbledrop_core::{
  CheckoutRequest, CheckoutSession, EventReference, GatewayEvent, OrderStatus, PaymentOutcome, SubscriptionCharge,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, subscription_id, status, subtotal_cents, shipping_cents, total_cents, \
 currency, recipient_name, street, city, postal_code, phone, payment_provider, payment_reference, cancel_reason, \
 created_at, updated_at";

const SHIPPING_FLAT_CENTS: i64 = 599;
const FREE_SHIPPING_THRESHOLD_CENTS: i64 = 50_00;

fn shipping_for(subtotal_cents: i64) -> i64 {
  if subtotal_cents >= FREE_SHIPPING_THRESHOLD_CENTS {
    0
  } else {
    SHIPPING_FLAT_CENTS
  }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
  pub recipient_name: String,
  pub street: String,
  pub city: String,
  pub postal_code: String,
  pub phone: Option<String>,
  /// Present when this order funds a subscription's first charge.
  pub subscription_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItem>,
}

async fn fetch_order(pool: &PgPool, order_id: Uuid) -> AppResult<Order> {
  let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
  order.ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))
}

async fn fetch_items(pool: &PgPool, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
  let items: Vec<OrderItem> = sqlx::query_as(
    "SELECT id, order_id, product_id, quantity, price_at_purchase_cents FROM order_items WHERE order_id = $1",
  )
  .bind(order_id)
  .fetch_all(pool)
  .await?;
  Ok(items)
}

/// Creates an order from the caller's cart, snapshotting prices, then
/// empties the cart. All rows commit together or not at all.
#[instrument(name = "orders::create_from_cart", skip(pool, input))]
pub async fn create_from_cart(pool: &PgPool, user_id: Uuid, input: &CreateOrderInput) -> AppResult<OrderDetail> {
  if input.recipient_name.trim().is_empty()
    || input.street.trim().is_empty()
    || input.city.trim().is_empty()
    || input.postal_code.trim().is_empty()
  {
    return Err(AppError::Validation("Delivery details are incomplete.".to_string()));
  }

  let cart_view = cart::view(pool, user_id).await?;
  if cart_view.items.is_empty() {
    return Err(AppError::Validation("Cart is empty.".to_string()));
  }

  let subtotal_cents = cart_view.total_cents;
  let shipping_cents = shipping_for(subtotal_cents);
  let total_cents = subtotal_cents + shipping_cents;

  let mut tx = pool.begin().await?;

  let order_id: Uuid = sqlx::query_scalar(
    "INSERT INTO orders (user_id, subscription_id, status, subtotal_cents, shipping_cents, total_cents, \
     recipient_name, street, city, postal_code, phone) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
  )
  .bind(user_id)
  .bind(input.subscription_id)
  .bind(OrderStatus::Pending.as_str())
  .bind(subtotal_cents)
  .bind(shipping_cents)
  .bind(total_cents)
  .bind(&input.recipient_name)
  .bind(&input.street)
  .bind(&input.city)
  .bind(&input.postal_code)
  .bind(&input.phone)
  .fetch_one(&mut *tx)
  .await?;

  for line in &cart_view.items {
    sqlx::query(
      "INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase_cents) VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.price_cents)
    .execute(&mut *tx)
    .await?;
  }

  sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;
  info!("Order {} created from cart ({} lines).", order_id, cart_view.items.len());

  let order = fetch_order(pool, order_id).await?;
  let items = fetch_items(pool, order_id).await?;
  Ok(OrderDetail { order, items })
}

#[instrument(name = "orders::list_for_user", skip(pool))]
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Order>> {
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    ORDER_COLUMNS
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  Ok(orders)
}

/// Owner-scoped fetch: an order belonging to somebody else reads as 404.
#[instrument(name = "orders::get_for_user", skip(pool))]
pub async fn get_for_user(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> AppResult<OrderDetail> {
  let order = fetch_order(pool, order_id).await?;
  if order.user_id != user_id {
    return Err(AppError::NotFound(format!("Order with ID {} not found.", order_id)));
  }
  let items = fetch_items(pool, order_id).await?;
  Ok(OrderDetail { order, items })
}

/// Opens a gateway checkout session for an order and moves it to
/// `payment_pending` (the canonical initiation status for every provider).
#[instrument(name = "orders::start_checkout", skip(state), fields(provider = %provider))]
pub async fn start_checkout(
  state: &AppState,
  user_id: Uuid,
  order_id: Uuid,
  provider: &str,
) -> AppResult<CheckoutSession> {
  let gateway = state
    .gateways
    .resolve(provider)
    .ok_or_else(|| AppError::NotFound(format!("Unknown payment provider '{}'.", provider)))?;

  let order = fetch_order(&state.db_pool, order_id).await?;
  if order.user_id != user_id {
    return Err(AppError::NotFound(format!("Order with ID {} not found.", order_id)));
  }
  let status = order.parsed_status()?;
  if !matches!(status, OrderStatus::Pending | OrderStatus::PaymentPending) {
    return Err(AppError::Validation(format!(
      "Order in status '{}' cannot start a checkout.",
      status
    )));
  }

  let customer_email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
    .bind(user_id)
    .fetch_one(&state.db_pool)
    .await?;

  let subscription = match order.subscription_id {
    Some(subscription_id) => {
      let sub = subscriptions::get_for_user(&state.db_pool, user_id, subscription_id).await?;
      Some(SubscriptionCharge {
        subscription_id,
        frequency: sub.subscription.parsed_frequency()?,
      })
    }
    None => None,
  };

  let req = CheckoutRequest {
    order_id,
    amount_cents: order.total_cents,
    currency: order.currency.clone(),
    customer_email,
    success_url: format!("{}/checkout/success?order={}", state.config.app_base_url, order_id),
    cancel_url: format!("{}/checkout/cancel?order={}", state.config.app_base_url, order_id),
    subscription,
  };

  let session = gateway.create_checkout(&req).await?;

  let next_status = status.transition(OrderStatus::PaymentPending)?;
  sqlx::query(
    "UPDATE orders SET status = $1, payment_provider = $2, payment_reference = $3, updated_at = NOW() WHERE id = $4",
  )
  .bind(next_status.as_str())
  .bind(&session.provider)
  .bind(&session.session_id)
  .bind(order_id)
  .execute(&state.db_pool)
  .await?;

  // The subscription inherits the gateway reference for later webhooks that
  // only carry the provider's own id.
  if let Some(subscription_id) = order.subscription_id {
    sqlx::query(
      "UPDATE subscriptions SET payment_provider = $1, payment_reference = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(&session.provider)
    .bind(&session.session_id)
    .bind(subscription_id)
    .execute(&state.db_pool)
    .await?;
  }

  info!(order_id = %order_id, session_id = %session.session_id, "Checkout session created.");
  Ok(session)
}

/// True when this event id has already been applied; such a delivery is
/// acknowledged without reprocessing.
#[instrument(name = "orders::webhook_event_seen", skip(pool))]
pub async fn webhook_event_seen(pool: &PgPool, provider: &str, event_id: &str) -> AppResult<bool> {
  let seen: bool =
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM webhook_events WHERE provider = $1 AND event_id = $2)")
      .bind(provider)
      .bind(event_id)
      .fetch_one(pool)
      .await?;
  Ok(seen)
}

/// Records a gateway event id in the dedup ledger. Callers do this only
/// after the event applied cleanly; a failed apply must leave no row, so
/// the gateway's retry of the same delivery is processed again. Concurrent
/// redeliveries that both pass the `webhook_event_seen` gate land here
/// together, which is safe: applying a status by value twice is a no-op.
#[instrument(name = "orders::record_webhook_event", skip(pool))]
pub async fn record_webhook_event(pool: &PgPool, provider: &str, event_id: &str) -> AppResult<()> {
  sqlx::query("INSERT INTO webhook_events (provider, event_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
    .bind(provider)
    .bind(event_id)
    .execute(pool)
    .await?;
  Ok(())
}

/// Applies a normalized gateway event to the order (or subscription) it
/// references. A successful payment on an order that funds a pending
/// subscription also activates that subscription.
#[instrument(name = "orders::apply_gateway_event", skip(state, event), fields(provider = %provider))]
pub async fn apply_gateway_event(state: &AppState, provider: &str, event: &GatewayEvent) -> AppResult<()> {
  match &event.reference {
    EventReference::Order(order_id) => {
      let order = fetch_order(&state.db_pool, *order_id).await?;
      apply_to_order(state, &order, event.outcome).await
    }
    EventReference::Subscription(subscription_id) => {
      apply_to_subscription(state, *subscription_id, event.outcome).await
    }
    EventReference::External(reference) => {
      let order: Option<Order> = sqlx::query_as(&format!(
        "SELECT {} FROM orders WHERE payment_reference = $1 AND payment_provider = $2",
        ORDER_COLUMNS
      ))
      .bind(reference)
      .bind(provider)
      .fetch_optional(&state.db_pool)
      .await?;
      if let Some(order) = order {
        return apply_to_order(state, &order, event.outcome).await;
      }

      let subscription_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM subscriptions WHERE payment_reference = $1 AND payment_provider = $2")
          .bind(reference)
          .bind(provider)
          .fetch_optional(&state.db_pool)
          .await?;
      match subscription_id {
        Some(id) => apply_to_subscription(state, id, event.outcome).await,
        None => Err(AppError::NotFound(format!(
          "No order or subscription matches gateway reference '{}'.",
          reference
        ))),
      }
    }
  }
}

async fn apply_to_order(state: &AppState, order: &Order, outcome: PaymentOutcome) -> AppResult<()> {
  let current = order.parsed_status()?;
  let next = outcome.order_status();
  if current == next {
    info!(order_id = %order.id, status = %current, "Webhook re-reported the current status; nothing to do.");
    return Ok(());
  }

  let next = current.transition(next)?;
  sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
    .bind(next.as_str())
    .bind(order.id)
    .execute(&state.db_pool)
    .await?;
  info!(order_id = %order.id, from = %current, to = %next, "Order status advanced by webhook.");

  if outcome == PaymentOutcome::Succeeded {
    if let Some(subscription_id) = order.subscription_id {
      subscriptions::activate_if_pending(state, subscription_id).await?;
    }
  }
  Ok(())
}

async fn apply_to_subscription(state: &AppState, subscription_id: Uuid, outcome: PaymentOutcome) -> AppResult<()> {
  match outcome {
    PaymentOutcome::Succeeded => subscriptions::activate_if_pending(state, subscription_id).await,
    PaymentOutcome::Failed | PaymentOutcome::Canceled => {
      subscriptions::cancel_internal(state, subscription_id).await
    }
    PaymentOutcome::Pending => {
      info!(subscription_id = %subscription_id, "Gateway reported a pending state; nothing to do.");
      Ok(())
    }
  }
}

// --- Admin surface ---

#[instrument(name = "orders::admin_list", skip(pool))]
pub async fn admin_list(pool: &PgPool) -> AppResult<Vec<Order>> {
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders ORDER BY created_at DESC",
    ORDER_COLUMNS
  ))
  .fetch_all(pool)
  .await?;
  Ok(orders)
}

#[instrument(name = "orders::admin_get", skip(pool))]
pub async fn admin_get(pool: &PgPool, order_id: Uuid) -> AppResult<OrderDetail> {
  let order = fetch_order(pool, order_id).await?;
  let items = fetch_items(pool, order_id).await?;
  Ok(OrderDetail { order, items })
}

/// Terminal orders cannot be canceled again: the re-apply rule would let a
/// second cancel through and silently overwrite the recorded reason.
fn cancellation_target(current: OrderStatus) -> AppResult<OrderStatus> {
  if current.is_terminal() {
    return Err(AppError::Validation(format!(
      "Order in status '{}' can no longer be canceled.",
      current
    )));
  }
  Ok(current.transition(OrderStatus::Canceled)?)
}

/// Admin cancellation: refused once the order is terminal; the reason lands
/// on the order row (no separate audit trail).
#[instrument(name = "orders::admin_cancel", skip(state))]
pub async fn admin_cancel(state: &AppState, order_id: Uuid, reason: &str) -> AppResult<OrderDetail> {
  let order = fetch_order(&state.db_pool, order_id).await?;
  let current = order.parsed_status()?;
  let next = cancellation_target(current)?;

  sqlx::query("UPDATE orders SET status = $1, cancel_reason = $2, updated_at = NOW() WHERE id = $3")
    .bind(next.as_str())
    .bind(reason)
    .bind(order_id)
    .execute(&state.db_pool)
    .await?;
  warn!(order_id = %order_id, reason = %reason, "Order canceled by admin.");

  // Notify the customer of the cancellation, without blocking on it.
  if let Ok(email) = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
    .bind(order.user_id)
    .fetch_one(&state.db_pool)
    .await
  {
    state.mailer.send_detached(
      email,
      "Your KibbleDrop order was canceled".to_string(),
      mailer::subscription_notice_body(&format!("Order {} was canceled: {}", order_id, reason), &[]),
    );
  }

  admin_get(&state.db_pool, order_id).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shipping_is_flat_below_the_threshold() {
    assert_eq!(shipping_for(0), SHIPPING_FLAT_CENTS);
    assert_eq!(shipping_for(FREE_SHIPPING_THRESHOLD_CENTS - 1), SHIPPING_FLAT_CENTS);
  }

  #[test]
  fn shipping_is_free_at_the_threshold() {
    assert_eq!(shipping_for(FREE_SHIPPING_THRESHOLD_CENTS), 0);
    assert_eq!(shipping_for(FREE_SHIPPING_THRESHOLD_CENTS + 1), 0);
  }

  #[test]
  fn cancellation_is_rejected_once_terminal() {
    for terminal in [OrderStatus::Completed, OrderStatus::Canceled, OrderStatus::Failed] {
      assert!(matches!(
        cancellation_target(terminal),
        Err(AppError::Validation(_))
      ));
    }
  }

  #[test]
  fn cancellation_allowed_while_in_flight() {
    for status in [
      OrderStatus::Pending,
      OrderStatus::PaymentPending,
      OrderStatus::Paid,
      OrderStatus::Processing,
      OrderStatus::Shipped,
    ] {
      assert_eq!(cancellation_target(status).unwrap(), OrderStatus::Canceled);
    }
  }
}
