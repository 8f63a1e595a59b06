// kibbledrop_server/src/services/cart.rs

//! The cart aggregate: one implicit cart per user, at most one line per
//! product, totals recomputed from live product prices on every view.

use crate::errors::{AppError, Result as AppResult};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  pub id: Uuid,
  pub product_id: Uuid,
  pub product_name: String,
  pub price_cents: i64,
  pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartView {
  pub items: Vec<CartLine>,
  pub total_cents: i64,
}

/// Sum of quantity x live product price. Not snapshotted: totals drift if
/// prices change between views, by design of the storefront.
fn cart_total(items: &[CartLine]) -> i64 {
  items.iter().map(|line| line.price_cents * i64::from(line.quantity)).sum()
}

#[instrument(name = "cart::view", skip(pool))]
pub async fn view(pool: &PgPool, user_id: Uuid) -> AppResult<CartView> {
  let items: Vec<CartLine> = sqlx::query_as(
    "SELECT ci.id, ci.product_id, p.name AS product_name, p.price_cents, ci.quantity \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.user_id = $1 ORDER BY ci.added_at ASC",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let total_cents = cart_total(&items);
  Ok(CartView { items, total_cents })
}

/// Adds `quantity` of a product; merges into the existing line when one
/// exists rather than inserting a duplicate row.
#[instrument(name = "cart::add", skip(pool))]
pub async fn add(pool: &PgPool, user_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<CartView> {
  if quantity <= 0 {
    return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
  }

  let product_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
  if product_exists.is_none() {
    return Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)));
  }

  sqlx::query(
    "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
     ON CONFLICT (user_id, product_id) DO UPDATE \
     SET quantity = cart_items.quantity + EXCLUDED.quantity, added_at = NOW()",
  )
  .bind(user_id)
  .bind(product_id)
  .bind(quantity)
  .execute(pool)
  .await?;

  info!("Cart line merged for user {}, product {}.", user_id, product_id);
  view(pool, user_id).await
}

/// Sets a line's quantity; a quantity of zero (or less) deletes the line.
#[instrument(name = "cart::update", skip(pool))]
pub async fn update(pool: &PgPool, user_id: Uuid, item_id: Uuid, quantity: i32) -> AppResult<CartView> {
  if quantity <= 0 {
    return remove(pool, user_id, item_id).await;
  }

  let result = sqlx::query("UPDATE cart_items SET quantity = $1 WHERE id = $2 AND user_id = $3")
    .bind(quantity)
    .bind(item_id)
    .bind(user_id)
    .execute(pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Cart item {} not found.", item_id)));
  }

  view(pool, user_id).await
}

#[instrument(name = "cart::remove", skip(pool))]
pub async fn remove(pool: &PgPool, user_id: Uuid, item_id: Uuid) -> AppResult<CartView> {
  let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
    .bind(item_id)
    .bind(user_id)
    .execute(pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Cart item {} not found.", item_id)));
  }

  view(pool, user_id).await
}

#[instrument(name = "cart::clear", skip(pool))]
pub async fn clear(pool: &PgPool, user_id: Uuid) -> AppResult<CartView> {
  sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  view(pool, user_id).await
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(price_cents: i64, quantity: i32) -> CartLine {
    CartLine {
      id: Uuid::new_v4(),
      product_id: Uuid::new_v4(),
      product_name: "Test Kibble".to_string(),
      price_cents,
      quantity,
    }
  }

  #[test]
  fn total_is_sum_of_quantity_times_live_price() {
    let items = vec![line(1250, 4), line(300, 1)];
    assert_eq!(cart_total(&items), 4 * 1250 + 300);
  }

  #[test]
  fn empty_cart_totals_zero() {
    assert_eq!(cart_total(&[]), 0);
  }
}
