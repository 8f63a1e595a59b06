// kibbledrop_server/src/web/handlers/subscription_handlers.rs

//! Subscription endpoints, all scoped to the signed-in owner. Skip,
//! frequency change, and custom dates go through the domain scheduler.

use crate::auth::AuthenticatedUser;
use crate::errors::Result as AppResult;
use crate::services::subscriptions;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

#[instrument(name = "handlers::subscriptions::create", skip(state, auth, body))]
pub async fn create(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  body: web::Json<subscriptions::CreateSubscriptionInput>,
) -> AppResult<HttpResponse> {
  let detail = subscriptions::create(&state.db_pool, auth.user_id, &body).await?;
  Ok(HttpResponse::Created().json(detail))
}

#[instrument(name = "handlers::subscriptions::list", skip(state, auth))]
pub async fn list(state: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
  let subscriptions = subscriptions::list_for_user(&state.db_pool, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(subscriptions))
}

#[instrument(name = "handlers::subscriptions::get", skip(state, auth))]
pub async fn get(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let detail = subscriptions::get_for_user(&state.db_pool, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handlers::subscriptions::skip", skip(state, auth))]
pub async fn skip(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let detail = subscriptions::skip(&state, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handlers::subscriptions::update", skip(state, auth, body))]
pub async fn update(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  body: web::Json<subscriptions::UpdateSubscriptionInput>,
) -> AppResult<HttpResponse> {
  let detail = subscriptions::update(&state, auth.user_id, path.into_inner(), &body).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handlers::subscriptions::cancel", skip(state, auth))]
pub async fn cancel(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let detail = subscriptions::cancel(&state, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}
