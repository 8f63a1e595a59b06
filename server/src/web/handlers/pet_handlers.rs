// kibbledrop_server/src/web/handlers/pet_handlers.rs

//! Pet profile CRUD, scoped to the signed-in owner.

use crate::auth::AuthenticatedUser;
use crate::errors::Result as AppResult;
use crate::services::pets;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

#[instrument(name = "handlers::pets::create", skip(state, auth, body))]
pub async fn create(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  body: web::Json<pets::PetProfileInput>,
) -> AppResult<HttpResponse> {
  let pet = pets::create(
    &state.db_pool,
    auth.user_id,
    body.into_inner(),
    state.config.max_upload_bytes,
  )
  .await?;
  Ok(HttpResponse::Created().json(pet))
}

#[instrument(name = "handlers::pets::list", skip(state, auth))]
pub async fn list(state: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
  let pets = pets::list(&state.db_pool, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(pets))
}

#[instrument(name = "handlers::pets::get", skip(state, auth))]
pub async fn get(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let pet = pets::get(&state.db_pool, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(pet))
}

#[instrument(name = "handlers::pets::update", skip(state, auth, body))]
pub async fn update(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  body: web::Json<pets::PetProfileInput>,
) -> AppResult<HttpResponse> {
  let pet = pets::update(
    &state.db_pool,
    auth.user_id,
    path.into_inner(),
    body.into_inner(),
    state.config.max_upload_bytes,
  )
  .await?;
  Ok(HttpResponse::Ok().json(pet))
}

#[instrument(name = "handlers::pets::delete", skip(state, auth))]
pub async fn delete(
  state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  pets::delete(&state.db_pool, auth.user_id, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
