// kibbledrop_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  // Sessions
  pub jwt_secret: String,
  pub session_ttl_hours: i64,

  // Uploads
  pub upload_dir: String,
  pub max_upload_bytes: usize,

  // Stripe
  pub stripe_secret_key: String,
  pub stripe_webhook_secret: String,

  // TradeSafe (REST-style integration)
  pub tradesafe_api_base: String,
  pub tradesafe_api_token: String,
  pub tradesafe_webhook_secret: String,

  // TradeSafe (GraphQL integration)
  pub tradesafe_graphql_endpoint: String,
  pub tradesafe_graphql_token: String,
  pub tradesafe_graphql_webhook_secret: String,

  // Transactional email; unset API key disables real sends.
  pub email_api_key: Option<String>,
  pub email_sender: String,

  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let jwt_secret = get_env("JWT_SECRET")?;
    let session_ttl_hours = get_env("SESSION_TTL_HOURS")
      .unwrap_or_else(|_| "72".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid SESSION_TTL_HOURS: {}", e)))?;

    let upload_dir = get_env("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string());
    let max_upload_bytes = get_env("MAX_UPLOAD_BYTES")
      .unwrap_or_else(|_| (5 * 1024 * 1024).to_string())
      .parse::<usize>()
      .map_err(|e| AppError::Config(format!("Invalid MAX_UPLOAD_BYTES: {}", e)))?;

    let stripe_secret_key = get_env("STRIPE_SECRET_KEY").unwrap_or_default();
    let stripe_webhook_secret = get_env("STRIPE_WEBHOOK_SECRET").unwrap_or_default();

    let tradesafe_api_base =
      get_env("TRADESAFE_API_BASE").unwrap_or_else(|_| "https://api.tradesafe.co.za/api".to_string());
    let tradesafe_api_token = get_env("TRADESAFE_API_TOKEN").unwrap_or_default();
    let tradesafe_webhook_secret = get_env("TRADESAFE_WEBHOOK_SECRET").unwrap_or_default();

    let tradesafe_graphql_endpoint =
      get_env("TRADESAFE_GRAPHQL_ENDPOINT").unwrap_or_else(|_| "https://api.tradesafe.co.za/graphql".to_string());
    let tradesafe_graphql_token = get_env("TRADESAFE_GRAPHQL_TOKEN").unwrap_or_default();
    let tradesafe_graphql_webhook_secret = get_env("TRADESAFE_GRAPHQL_WEBHOOK_SECRET").unwrap_or_default();

    let email_api_key = env::var("EMAIL_API_KEY").ok().filter(|v| !v.is_empty());
    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "noreply@kibbledrop.example".to_string());

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      jwt_secret,
      session_ttl_hours,
      upload_dir,
      max_upload_bytes,
      stripe_secret_key,
      stripe_webhook_secret,
      tradesafe_api_base,
      tradesafe_api_token,
      tradesafe_webhook_secret,
      tradesafe_graphql_endpoint,
      tradesafe_graphql_token,
      tradesafe_graphql_webhook_secret,
      email_api_key,
      email_sender,
      seed_db,
    })
  }
}
