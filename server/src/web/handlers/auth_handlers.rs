// kibbledrop_server/src/web/handlers/auth_handlers.rs

//! Signup/signin/signout and the current-user endpoint. Sessions are JWTs
//! in an HttpOnly cookie; the response body never carries the token.

use crate::auth::{password, session, AuthenticatedUser};
use crate::errors::{AppError, Result as AppResult};
use crate::models::{user::ROLE_CUSTOMER, User};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
  pub email: String,
  pub name: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handlers::auth::signup", skip(state, body), fields(email = %body.email))]
pub async fn signup(state: web::Data<AppState>, body: web::Json<SignupRequest>) -> AppResult<HttpResponse> {
  let email = body.email.trim().to_lowercase();
  if email.is_empty() || !email.contains('@') {
    return Err(AppError::Validation("A valid email address is required.".to_string()));
  }
  if body.name.trim().is_empty() {
    return Err(AppError::Validation("Name is required.".to_string()));
  }
  if body.password.len() < 8 {
    return Err(AppError::Validation("Password must be at least 8 characters.".to_string()));
  }

  let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
    .bind(&email)
    .fetch_one(&state.db_pool)
    .await?;
  if taken {
    return Err(AppError::Validation("An account with this email already exists.".to_string()));
  }

  let password_hash = password::hash_password(&body.password)?;
  let user: User = sqlx::query_as(&format!(
    "INSERT INTO users (email, name, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
    USER_COLUMNS
  ))
  .bind(&email)
  .bind(body.name.trim())
  .bind(&password_hash)
  .bind(ROLE_CUSTOMER)
  .fetch_one(&state.db_pool)
  .await?;

  info!(user_id = %user.id, "New account created.");
  let token = session::issue_session_token(&user, &state.config.jwt_secret, state.config.session_ttl_hours)?;
  Ok(
    HttpResponse::Created()
      .cookie(session::session_cookie(token, state.config.session_ttl_hours))
      .json(user),
  )
}

#[instrument(name = "handlers::auth::signin", skip(state, body), fields(email = %body.email))]
pub async fn signin(state: web::Data<AppState>, body: web::Json<SigninRequest>) -> AppResult<HttpResponse> {
  let email = body.email.trim().to_lowercase();

  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
    .bind(&email)
    .fetch_optional(&state.db_pool)
    .await?;
  // One failure message for both unknown email and bad password.
  let user = user.ok_or_else(|| AppError::Auth("Invalid email or password.".to_string()))?;
  if !password::verify_password(&user.password_hash, &body.password)? {
    return Err(AppError::Auth("Invalid email or password.".to_string()));
  }

  let token = session::issue_session_token(&user, &state.config.jwt_secret, state.config.session_ttl_hours)?;
  Ok(
    HttpResponse::Ok()
      .cookie(session::session_cookie(token, state.config.session_ttl_hours))
      .json(user),
  )
}

#[instrument(name = "handlers::auth::signout")]
pub async fn signout() -> HttpResponse {
  HttpResponse::Ok()
    .cookie(session::clear_session_cookie())
    .json(serde_json::json!({ "signed_out": true }))
}

#[instrument(name = "handlers::auth::me", skip(state))]
pub async fn me(state: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?;
  let user = user.ok_or_else(|| AppError::Auth("Session user no longer exists.".to_string()))?;
  Ok(HttpResponse::Ok().json(user))
}
