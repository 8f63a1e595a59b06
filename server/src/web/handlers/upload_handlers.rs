// kibbledrop_server/src/web/handlers/upload_handlers.rs

//! Raw-body image upload for the catalog. The body is the image bytes; the
//! type is decided by magic-byte sniffing, never by the request headers.

use crate::auth::AuthenticatedUser;
use crate::errors::Result as AppResult;
use crate::services::uploads;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::instrument;

#[instrument(name = "handlers::uploads::upload_image", skip(state, _auth, body), fields(size = body.len()))]
pub async fn upload_image(
  state: web::Data<AppState>,
  _auth: AuthenticatedUser,
  body: web::Bytes,
) -> AppResult<HttpResponse> {
  let url = uploads::store_image(&state.config.upload_dir, state.config.max_upload_bytes, &body).await?;
  Ok(HttpResponse::Created().json(serde_json::json!({ "url": url })))
}
