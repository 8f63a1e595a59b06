// kibbledrop_server/src/services/users.rs

//! Admin-side account management. Deletion is refused while the account
//! has an active subscription; otherwise the account and everything
//! hanging off it go in one transaction.

use crate::errors::{AppError, Result as AppResult};
use crate::models::User;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

#[instrument(name = "users::list", skip(pool))]
pub async fn list(pool: &PgPool) -> AppResult<Vec<User>> {
  let users: Vec<User> = sqlx::query_as(&format!(
    "SELECT {} FROM users ORDER BY created_at DESC",
    USER_COLUMNS
  ))
  .fetch_all(pool)
  .await?;
  Ok(users)
}

#[instrument(name = "users::get", skip(pool))]
pub async fn get(pool: &PgPool, user_id: Uuid) -> AppResult<User> {
  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
  user.ok_or_else(|| AppError::NotFound(format!("User with ID {} not found.", user_id)))
}

/// Deletes an account and its cart, pets, subscriptions, and orders.
/// Refused while an active subscription exists; cancel that first.
#[instrument(name = "users::delete", skip(pool))]
pub async fn delete(pool: &PgPool, user_id: Uuid) -> AppResult<()> {
  get(pool, user_id).await?;

  let has_active: bool = sqlx::query_scalar(
    "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND status = 'active')",
  )
  .bind(user_id)
  .fetch_one(pool)
  .await?;
  if has_active {
    return Err(AppError::Validation(
      "User has an active subscription; cancel it before deleting the account.".to_string(),
    ));
  }

  let mut tx = pool.begin().await?;

  sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM pet_profiles WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query(
    "DELETE FROM subscription_items WHERE subscription_id IN (SELECT id FROM subscriptions WHERE user_id = $1)",
  )
  .bind(user_id)
  .execute(&mut *tx)
  .await?;
  sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM order_items WHERE order_id IN (SELECT id FROM orders WHERE user_id = $1)")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM orders WHERE user_id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  sqlx::query("DELETE FROM users WHERE id = $1")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;
  info!("User {} and dependent records deleted.", user_id);
  Ok(())
}
