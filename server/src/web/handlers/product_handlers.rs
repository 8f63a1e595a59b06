// kibbledrop_server/src/web/handlers/product_handlers.rs

//! Public catalog reads. Mutations live under `/admin`.

use crate::errors::Result as AppResult;
use crate::services::catalog;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

#[instrument(name = "handlers::products::list", skip(state, filter))]
pub async fn list(state: web::Data<AppState>, filter: web::Query<catalog::ProductFilter>) -> AppResult<HttpResponse> {
  let products = catalog::list(&state.db_pool, &filter).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handlers::products::get", skip(state))]
pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
  let detail = catalog::get_with_variants(&state.db_pool, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}
