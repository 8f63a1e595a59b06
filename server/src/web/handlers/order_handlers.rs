// kibbledrop_server/src/web/handlers/order_handlers.rs

//! Customer-facing order endpoints and checkout initiation. The provider
//! comes from the URL path and is resolved against the gateway registry.

use crate::auth::AuthenticatedUser;
use crate::errors::Result as AppResult;
use crate::services::orders;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequestBody {
  pub order_id: Uuid,
}

#[instrument(name = "handlers::orders::create", skip(state, auth, body))]
pub async fn create(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  body: web::Json<orders::CreateOrderInput>,
) -> AppResult<HttpResponse> {
  let detail = orders::create_from_cart(&state.db_pool, auth.user_id, &body).await?;
  Ok(HttpResponse::Created().json(detail))
}

#[instrument(name = "handlers::orders::list", skip(state, auth))]
pub async fn list(state: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
  let orders = orders::list_for_user(&state.db_pool, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handlers::orders::get", skip(state, auth))]
pub async fn get(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let detail = orders::get_for_user(&state.db_pool, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handlers::orders::checkout", skip(state, auth, body), fields(provider = %path))]
pub async fn checkout(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<String>,
  body: web::Json<CheckoutRequestBody>,
) -> AppResult<HttpResponse> {
  let session = orders::start_checkout(&state, auth.user_id, body.order_id, &path).await?;
  Ok(HttpResponse::Ok().json(session))
}
