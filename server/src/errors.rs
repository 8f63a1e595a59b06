// kibbledrop_server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use kibbledrop_core::DomainError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Domain Error: {source}")]
  Domain {
    #[from]
    source: DomainError,
  },

  #[error("Email Service Error: {0}")]
  Email(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in handlers that call `?` on anyhow-returning helpers.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // The full error goes to the log; clients get the coarse taxonomy.
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Payment(m) => HttpResponse::PaymentRequired().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Domain { source } => match source {
        DomainError::SignatureInvalid(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
        DomainError::Gateway { source } => {
          tracing::error!(gateway_error = ?source, "Gateway failure details");
          HttpResponse::InternalServerError().json(json!({"error": "Payment provider error"}))
        }
        other => HttpResponse::BadRequest().json(json!({"error": other.to_string()})),
      },
      AppError::Email(m) => HttpResponse::InternalServerError().json(json!({"error": "Email service error", "detail": m})),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;

  #[test]
  fn status_codes_follow_the_taxonomy() {
    let cases = [
      (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
      (AppError::Auth("no session".into()), StatusCode::UNAUTHORIZED),
      (AppError::Forbidden("customers only".into()), StatusCode::FORBIDDEN),
      (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
      (AppError::Payment("declined".into()), StatusCode::PAYMENT_REQUIRED),
      (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
      assert_eq!(err.error_response().status(), expected);
    }
  }

  #[test]
  fn bad_signature_maps_to_unauthorized() {
    let err = AppError::from(DomainError::SignatureInvalid("mismatch".into()));
    assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
  }

  #[test]
  fn invalid_transition_maps_to_bad_request() {
    let err = AppError::from(DomainError::InvalidTransition {
      from: "completed".into(),
      to: "paid".into(),
    });
    assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
  }
}
