// kibbledrop_server/src/auth/session.rs

//! JWT session tokens and the authorization extractors.
//!
//! Every handler that mutates state takes one of the extractors below as an
//! argument, so the session/role checks run before the handler body ever
//! executes. `AuthenticatedUser` decodes the session cookie (401 on
//! failure); `AdminUser` additionally loads the User row and requires the
//! admin role (403 otherwise) — the single gate for the whole `/admin`
//! surface.

use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::warn;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "kd_session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub role: String,
  pub exp: usize,
}

pub fn issue_session_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
  let expires_at = Utc::now() + chrono::Duration::hours(ttl_hours);
  let claims = Claims {
    sub: user.id,
    role: user.role.clone(),
    exp: expires_at.timestamp() as usize,
  };
  encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
    .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
}

pub fn decode_session_token(token: &str, secret: &str) -> Result<Claims, AppError> {
  decode::<Claims>(
    token,
    &DecodingKey::from_secret(secret.as_bytes()),
    &Validation::default(),
  )
  .map(|data| data.claims)
  .map_err(|e| AppError::Auth(format!("Invalid or expired session token: {}", e)))
}

pub fn session_cookie(token: String, ttl_hours: i64) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::hours(ttl_hours))
    .finish()
}

pub fn clear_session_cookie() -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, "")
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::ZERO)
    .finish()
}

/// The signed-in caller, as carried by the session cookie.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: String,
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
  let cookie = req.cookie(SESSION_COOKIE).ok_or_else(|| {
    warn!("AuthenticatedUser extractor: missing session cookie.");
    AppError::Auth("User authentication required.".to_string())
  })?;
  let claims = decode_session_token(cookie.value(), &state.config.jwt_secret)?;
  Ok(AuthenticatedUser {
    user_id: claims.sub,
    role: claims.role,
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    futures_util::future::ready(authenticate(req))
  }
}

/// An authenticated caller whose User row carries the admin role.
///
/// The role comes from the database, not the token, so revoking admin takes
/// effect on the next request rather than at token expiry.
#[derive(Debug)]
pub struct AdminUser {
  pub user: User,
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let auth_result = authenticate(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();

    Box::pin(async move {
      let auth = auth_result?;
      let state = state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

      let user: Option<User> = sqlx::query_as(
        "SELECT id, email, password_hash, name, role, created_at, updated_at FROM users WHERE id = $1",
      )
      .bind(auth.user_id)
      .fetch_optional(&state.db_pool)
      .await?;

      let user = user.ok_or_else(|| AppError::Auth("Session user no longer exists.".to_string()))?;
      if !user.is_admin() {
        warn!(user_id = %user.id, "Non-admin session attempted an admin endpoint.");
        return Err(AppError::Forbidden("Administrator role required.".to_string()));
      }
      Ok(AdminUser { user })
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::user::ROLE_ADMIN;

  fn fixture_user(role: &str) -> User {
    User {
      id: Uuid::new_v4(),
      email: "pat@example.com".to_string(),
      password_hash: "hash".to_string(),
      name: "Pat".to_string(),
      role: role.to_string(),
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn token_round_trip_preserves_claims() {
    let user = fixture_user(ROLE_ADMIN);
    let token = issue_session_token(&user, "test-secret", 1).unwrap();
    let claims = decode_session_token(&token, "test-secret").unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, ROLE_ADMIN);
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let user = fixture_user("customer");
    let token = issue_session_token(&user, "test-secret", 1).unwrap();
    assert!(decode_session_token(&token, "other-secret").is_err());
  }

  #[test]
  fn expired_token_is_rejected() {
    let user = fixture_user("customer");
    let token = issue_session_token(&user, "test-secret", -1).unwrap();
    assert!(decode_session_token(&token, "test-secret").is_err());
  }
}
