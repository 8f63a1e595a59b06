// kibbledrop_server/src/services/subscriptions.rs

//! Recurring-delivery subscriptions: creation, the skip/frequency/custom
//! date operations backed by the domain scheduler, and the status
//! transitions driven by payment webhooks. Status changes notify the
//! subscriber by email with the affected item names; the notification is
//! fire-and-forget and never rolls back the transition.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Subscription, SubscriptionItem};
use crate::services::mailer;
use crate::state::AppState;
use chrono::{NaiveDate, Utc};
use kibbledrop_core::{next_delivery_after, Frequency, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, pet_profile_id, frequency, status, next_delivery, \
 skipped_deliveries, payment_provider, payment_reference, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct SubscriptionItemInput {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionInput {
  pub pet_profile_id: Option<Uuid>,
  pub frequency: String,
  pub items: Vec<SubscriptionItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionInput {
  pub frequency: Option<String>,
  /// Explicit custom date; overrides any computed value unconditionally.
  pub next_delivery: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDetail {
  #[serde(flatten)]
  pub subscription: Subscription,
  pub items: Vec<SubscriptionItem>,
}

async fn fetch_subscription(pool: &PgPool, subscription_id: Uuid) -> AppResult<Subscription> {
  let subscription: Option<Subscription> = sqlx::query_as(&format!(
    "SELECT {} FROM subscriptions WHERE id = $1",
    SUBSCRIPTION_COLUMNS
  ))
  .bind(subscription_id)
  .fetch_optional(pool)
  .await?;
  subscription.ok_or_else(|| AppError::NotFound(format!("Subscription with ID {} not found.", subscription_id)))
}

async fn fetch_items(pool: &PgPool, subscription_id: Uuid) -> AppResult<Vec<SubscriptionItem>> {
  let items: Vec<SubscriptionItem> = sqlx::query_as(
    "SELECT id, subscription_id, product_id, quantity FROM subscription_items WHERE subscription_id = $1",
  )
  .bind(subscription_id)
  .fetch_all(pool)
  .await?;
  Ok(items)
}

async fn fetch_owned(pool: &PgPool, user_id: Uuid, subscription_id: Uuid) -> AppResult<Subscription> {
  let subscription = fetch_subscription(pool, subscription_id).await?;
  if subscription.user_id != user_id {
    // Not-owned reads as not-found; ownership is never disclosed.
    return Err(AppError::NotFound(format!(
      "Subscription with ID {} not found.",
      subscription_id
    )));
  }
  Ok(subscription)
}

/// Sends the status-change notice with the subscription's item names.
/// Failures are logged by the mailer and never propagate.
async fn notify_status_change(state: &AppState, subscription_id: Uuid, subject: &str, headline: &str) {
  let recipient: Result<Option<String>, sqlx::Error> = sqlx::query_scalar(
    "SELECT u.email FROM users u JOIN subscriptions s ON s.user_id = u.id WHERE s.id = $1",
  )
  .bind(subscription_id)
  .fetch_optional(&state.db_pool)
  .await;
  let item_names: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
    "SELECT p.name FROM subscription_items si JOIN products p ON p.id = si.product_id \
     WHERE si.subscription_id = $1",
  )
  .bind(subscription_id)
  .fetch_all(&state.db_pool)
  .await;

  match (recipient, item_names) {
    (Ok(Some(email)), Ok(names)) => {
      state
        .mailer
        .send_detached(email, subject.to_string(), mailer::subscription_notice_body(headline, &names));
    }
    (recipient, items) => {
      tracing::warn!(
        subscription_id = %subscription_id,
        recipient_err = recipient.is_err(),
        items_err = items.is_err(),
        "Could not assemble subscription notification; skipping."
      );
    }
  }
}

/// Creates a pending subscription with its items in one transaction. It
/// stays pending until the first payment succeeds.
#[instrument(name = "subscriptions::create", skip(pool, input))]
pub async fn create(pool: &PgPool, user_id: Uuid, input: &CreateSubscriptionInput) -> AppResult<SubscriptionDetail> {
  let frequency: Frequency = input.frequency.parse()?;
  if input.items.is_empty() {
    return Err(AppError::Validation("A subscription needs at least one item.".to_string()));
  }
  if input.items.iter().any(|item| item.quantity <= 0) {
    return Err(AppError::Validation("Item quantities must be positive.".to_string()));
  }

  if let Some(pet_profile_id) = input.pet_profile_id {
    let owned: bool =
      sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pet_profiles WHERE id = $1 AND user_id = $2)")
        .bind(pet_profile_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if !owned {
      return Err(AppError::NotFound(format!(
        "Pet profile with ID {} not found.",
        pet_profile_id
      )));
    }
  }

  let mut tx = pool.begin().await?;

  let subscription_id: Uuid = sqlx::query_scalar(
    "INSERT INTO subscriptions (user_id, pet_profile_id, frequency, status) VALUES ($1, $2, $3, $4) RETURNING id",
  )
  .bind(user_id)
  .bind(input.pet_profile_id)
  .bind(frequency.as_str())
  .bind(SubscriptionStatus::Pending.as_str())
  .fetch_one(&mut *tx)
  .await?;

  for item in &input.items {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
      .bind(item.product_id)
      .fetch_one(&mut *tx)
      .await?;
    if !exists {
      return Err(AppError::NotFound(format!(
        "Product with ID {} not found.",
        item.product_id
      )));
    }
    sqlx::query("INSERT INTO subscription_items (subscription_id, product_id, quantity) VALUES ($1, $2, $3)")
      .bind(subscription_id)
      .bind(item.product_id)
      .bind(item.quantity)
      .execute(&mut *tx)
      .await?;
  }

  tx.commit().await?;
  info!("Subscription {} created ({} items, {}).", subscription_id, input.items.len(), frequency);

  get_for_user(pool, user_id, subscription_id).await
}

#[instrument(name = "subscriptions::list_for_user", skip(pool))]
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Subscription>> {
  let subscriptions: Vec<Subscription> = sqlx::query_as(&format!(
    "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
    SUBSCRIPTION_COLUMNS
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  Ok(subscriptions)
}

#[instrument(name = "subscriptions::get_for_user", skip(pool))]
pub async fn get_for_user(pool: &PgPool, user_id: Uuid, subscription_id: Uuid) -> AppResult<SubscriptionDetail> {
  let subscription = fetch_owned(pool, user_id, subscription_id).await?;
  let items = fetch_items(pool, subscription_id).await?;
  Ok(SubscriptionDetail { subscription, items })
}

/// Defers the next delivery by one interval: the skipped date joins the
/// skip list and the new date counts from the skipped one, not from today.
#[instrument(name = "subscriptions::skip", skip(state))]
pub async fn skip(state: &AppState, user_id: Uuid, subscription_id: Uuid) -> AppResult<SubscriptionDetail> {
  let subscription = fetch_owned(&state.db_pool, user_id, subscription_id).await?;
  if subscription.parsed_status()? != SubscriptionStatus::Active {
    return Err(AppError::Validation(
      "Only an active subscription can skip a delivery.".to_string(),
    ));
  }
  let mut schedule = subscription
    .schedule()
    .ok_or_else(|| AppError::Validation("Subscription has no scheduled delivery to skip.".to_string()))?;

  schedule.skip(subscription.parsed_frequency()?);

  sqlx::query(
    "UPDATE subscriptions SET next_delivery = $1, skipped_deliveries = $2, updated_at = NOW() WHERE id = $3",
  )
  .bind(schedule.next_delivery)
  .bind(&schedule.skipped)
  .bind(subscription_id)
  .execute(&state.db_pool)
  .await?;

  get_for_user(&state.db_pool, user_id, subscription_id).await
}

/// Frequency changes recompute from today; an explicit date wins over the
/// computed one when both are supplied.
#[instrument(name = "subscriptions::update", skip(state, input))]
pub async fn update(
  state: &AppState,
  user_id: Uuid,
  subscription_id: Uuid,
  input: &UpdateSubscriptionInput,
) -> AppResult<SubscriptionDetail> {
  let subscription = fetch_owned(&state.db_pool, user_id, subscription_id).await?;

  let mut frequency = subscription.parsed_frequency()?;
  let mut next_delivery = subscription.next_delivery;

  if let Some(raw) = &input.frequency {
    frequency = raw.parse()?;
    next_delivery = Some(next_delivery_after(frequency, Utc::now().date_naive()));
  }
  if let Some(custom) = input.next_delivery {
    next_delivery = Some(custom);
  }

  sqlx::query("UPDATE subscriptions SET frequency = $1, next_delivery = $2, updated_at = NOW() WHERE id = $3")
    .bind(frequency.as_str())
    .bind(next_delivery)
    .bind(subscription_id)
    .execute(&state.db_pool)
    .await?;

  get_for_user(&state.db_pool, user_id, subscription_id).await
}

#[instrument(name = "subscriptions::cancel", skip(state))]
pub async fn cancel(state: &AppState, user_id: Uuid, subscription_id: Uuid) -> AppResult<SubscriptionDetail> {
  fetch_owned(&state.db_pool, user_id, subscription_id).await?;
  cancel_internal(state, subscription_id).await?;
  get_for_user(&state.db_pool, user_id, subscription_id).await
}

/// Pending -> active on first successful payment, scheduling the first
/// delivery one interval out from today. Idempotent for redelivered
/// webhooks: anything already past pending is left alone.
#[instrument(name = "subscriptions::activate_if_pending", skip(state))]
pub async fn activate_if_pending(state: &AppState, subscription_id: Uuid) -> AppResult<()> {
  let subscription = fetch_subscription(&state.db_pool, subscription_id).await?;
  if subscription.parsed_status()? != SubscriptionStatus::Pending {
    info!(subscription_id = %subscription_id, status = %subscription.status, "Subscription already past pending.");
    return Ok(());
  }

  let frequency = subscription.parsed_frequency()?;
  let first_delivery = next_delivery_after(frequency, Utc::now().date_naive());

  sqlx::query("UPDATE subscriptions SET status = $1, next_delivery = $2, updated_at = NOW() WHERE id = $3")
    .bind(SubscriptionStatus::Active.as_str())
    .bind(first_delivery)
    .bind(subscription_id)
    .execute(&state.db_pool)
    .await?;
  info!(subscription_id = %subscription_id, next_delivery = %first_delivery, "Subscription activated.");

  notify_status_change(
    state,
    subscription_id,
    "Your KibbleDrop subscription is active",
    "Your subscription is now active. First delivery is on its way soon:",
  )
  .await;
  Ok(())
}

/// Cancels regardless of owner; used by webhooks and the user-facing
/// cancel. Already-canceled subscriptions are left untouched.
#[instrument(name = "subscriptions::cancel_internal", skip(state))]
pub async fn cancel_internal(state: &AppState, subscription_id: Uuid) -> AppResult<()> {
  let subscription = fetch_subscription(&state.db_pool, subscription_id).await?;
  if subscription.parsed_status()? == SubscriptionStatus::Canceled {
    return Ok(());
  }

  sqlx::query("UPDATE subscriptions SET status = $1, updated_at = NOW() WHERE id = $2")
    .bind(SubscriptionStatus::Canceled.as_str())
    .bind(subscription_id)
    .execute(&state.db_pool)
    .await?;
  info!(subscription_id = %subscription_id, "Subscription canceled.");

  notify_status_change(
    state,
    subscription_id,
    "Your KibbleDrop subscription was canceled",
    "Your subscription was canceled. It included:",
  )
  .await;
  Ok(())
}
