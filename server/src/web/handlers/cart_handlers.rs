// kibbledrop_server/src/web/handlers/cart_handlers.rs

//! Cart endpoints. Every mutation responds with the recomputed cart view.

use crate::auth::AuthenticatedUser;
use crate::errors::Result as AppResult;
use crate::services::cart;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
  pub quantity: i32,
}

#[instrument(name = "handlers::cart::view", skip(state, auth))]
pub async fn view(state: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
  let view = cart::view(&state.db_pool, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handlers::cart::add_item", skip(state, auth, body))]
pub async fn add_item(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  body: web::Json<AddItemRequest>,
) -> AppResult<HttpResponse> {
  let view = cart::add(&state.db_pool, auth.user_id, body.product_id, body.quantity).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handlers::cart::update_item", skip(state, auth, body))]
pub async fn update_item(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  body: web::Json<UpdateItemRequest>,
) -> AppResult<HttpResponse> {
  let view = cart::update(&state.db_pool, auth.user_id, path.into_inner(), body.quantity).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handlers::cart::remove_item", skip(state, auth))]
pub async fn remove_item(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let view = cart::remove(&state.db_pool, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(name = "handlers::cart::clear", skip(state, auth))]
pub async fn clear(state: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
  let view = cart::clear(&state.db_pool, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(view))
}
