// kibbledrop_server/src/web/handlers/webhook_handlers.rs

//! The shared webhook receiver for every payment provider.
//!
//! Order of checks: resolve the adapter (404), verify the signature over
//! the raw bytes (401), parse (400 on malformed JSON, 200 on well-formed
//! but unhandled event types), drop event ids already in the ledger, then
//! apply the normalized event. The event id is recorded only after the
//! event applied cleanly: a failure returns 4xx/5xx, leaves no ledger row,
//! and the gateway's retry of the same delivery is processed again.

use crate::errors::{AppError, Result as AppResult};
use crate::services::orders;
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, instrument, warn};

#[instrument(name = "handlers::webhooks::receive", skip(state, req, body), fields(provider = %path, size = body.len()))]
pub async fn receive(
  state: web::Data<AppState>,
  path: web::Path<String>,
  req: HttpRequest,
  body: web::Bytes,
) -> AppResult<HttpResponse> {
  let provider = path.into_inner();
  let gateway = state
    .gateways
    .resolve(&provider)
    .ok_or_else(|| AppError::NotFound(format!("Unknown payment provider '{}'.", provider)))?;

  let signature = req
    .headers()
    .get(gateway.signature_header())
    .and_then(|value| value.to_str().ok());
  gateway.verify_webhook(&body, signature)?;

  let Some(event) = gateway.parse_event(&body)? else {
    info!("Webhook carries an event type this system ignores; acknowledged.");
    return Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })));
  };

  if let Some(event_id) = &event.event_id {
    if orders::webhook_event_seen(&state.db_pool, &provider, event_id).await? {
      warn!(event_id = %event_id, "Duplicate webhook delivery dropped.");
      return Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true, "duplicate": true })));
    }
  }

  orders::apply_gateway_event(&state, &provider, &event).await?;

  // Recorded only now: an error above returned 5xx with no ledger row, so
  // the gateway's retry is not mistaken for a duplicate.
  if let Some(event_id) = &event.event_id {
    orders::record_webhook_event(&state.db_pool, &provider, event_id).await?;
  }
  Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
