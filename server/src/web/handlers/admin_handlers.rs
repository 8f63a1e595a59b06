// kibbledrop_server/src/web/handlers/admin_handlers.rs

//! The `/admin` surface. Every handler takes the `AdminUser` extractor, so
//! a non-admin session is rejected with 403 before any side effect.

use crate::auth::AdminUser;
use crate::errors::Result as AppResult;
use crate::services::{catalog, orders, users};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
  pub reason: String,
}

// --- Products ---

#[instrument(name = "handlers::admin::create_product", skip(state, admin, body), fields(admin = %admin.user.id))]
pub async fn create_product(
  state: web::Data<AppState>,
  admin: AdminUser,
  body: web::Json<catalog::ProductInput>,
) -> AppResult<HttpResponse> {
  let detail = catalog::create(&state.db_pool, &body).await?;
  Ok(HttpResponse::Created().json(detail))
}

#[instrument(name = "handlers::admin::update_product", skip(state, admin, body), fields(admin = %admin.user.id))]
pub async fn update_product(
  state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  body: web::Json<catalog::ProductInput>,
) -> AppResult<HttpResponse> {
  let detail = catalog::update(&state.db_pool, path.into_inner(), &body).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handlers::admin::delete_product", skip(state, admin), fields(admin = %admin.user.id))]
pub async fn delete_product(
  state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  catalog::delete(&state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

// --- Orders ---

#[instrument(name = "handlers::admin::list_orders", skip(state, admin), fields(admin = %admin.user.id))]
pub async fn list_orders(state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let orders = orders::admin_list(&state.db_pool).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handlers::admin::get_order", skip(state, admin), fields(admin = %admin.user.id))]
pub async fn get_order(
  state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let detail = orders::admin_get(&state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handlers::admin::cancel_order", skip(state, admin, body), fields(admin = %admin.user.id))]
pub async fn cancel_order(
  state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  body: web::Json<CancelOrderRequest>,
) -> AppResult<HttpResponse> {
  let detail = orders::admin_cancel(&state, path.into_inner(), &body.reason).await?;
  Ok(HttpResponse::Ok().json(detail))
}

// --- Users ---

#[instrument(name = "handlers::admin::list_users", skip(state, admin), fields(admin = %admin.user.id))]
pub async fn list_users(state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let users = users::list(&state.db_pool).await?;
  Ok(HttpResponse::Ok().json(users))
}

#[instrument(name = "handlers::admin::get_user", skip(state, admin), fields(admin = %admin.user.id))]
pub async fn get_user(
  state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let user = users::get(&state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handlers::admin::delete_user", skip(state, admin), fields(admin = %admin.user.id))]
pub async fn delete_user(
  state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  users::delete(&state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
