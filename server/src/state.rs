// kibbledrop_server/src/state.rs
use crate::config::AppConfig;
use crate::payments::GatewayRegistry;
use crate::services::mailer::Mailer;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>,
  pub gateways: Arc<GatewayRegistry>,
  pub mailer: Arc<Mailer>,
}
