// kibbledrop_server/src/services/mailer.rs

//! Transactional email over a Brevo-style HTTP API.
//!
//! Subscription status changes notify the subscriber with the affected item
//! names. Sends are fire-and-forget from the caller's perspective: a mail
//! failure is logged and never rolls back the state change that triggered
//! it.

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const EMAIL_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

pub struct Mailer {
  api_key: Option<String>,
  sender: String,
  http: reqwest::Client,
}

impl Mailer {
  pub fn new(config: &AppConfig) -> Self {
    if config.email_api_key.is_none() {
      warn!("EMAIL_API_KEY not set; emails will be logged instead of sent.");
    }
    Self {
      api_key: config.email_api_key.clone(),
      sender: config.email_sender.clone(),
      http: reqwest::Client::new(),
    }
  }

  #[instrument(name = "mailer::send", skip(self, html_body), fields(to = %to, subject = %subject))]
  pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> AppResult<()> {
    let Some(api_key) = &self.api_key else {
      info!("Email delivery disabled; would have sent '{}' to {}.", subject, to);
      return Ok(());
    };

    let body = json!({
      "sender": { "email": self.sender },
      "to": [{ "email": to }],
      "subject": subject,
      "htmlContent": html_body,
    });

    let response = self
      .http
      .post(EMAIL_API_URL)
      .header("api-key", api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::Email(format!("Email API request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(AppError::Email(format!(
        "Email API returned {}",
        response.status()
      )));
    }

    info!("Email sent successfully.");
    Ok(())
  }

  /// Sends without awaiting the outcome; failures only reach the log.
  pub fn send_detached(self: &Arc<Self>, to: String, subject: String, html_body: String) {
    let mailer = Arc::clone(self);
    tokio::spawn(async move {
      if let Err(e) = mailer.send(&to, &subject, &html_body).await {
        error!(error = %e, to = %to, "Detached email send failed.");
      }
    });
  }
}

/// Body for a subscription status-change notification, listing the items.
pub fn subscription_notice_body(headline: &str, item_names: &[String]) -> String {
  let items = item_names
    .iter()
    .map(|name| format!("<li>{}</li>", name))
    .collect::<String>();
  format!("<p>{}</p><ul>{}</ul>", headline, items)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn notice_body_lists_every_item() {
    let body = subscription_notice_body(
      "Your subscription is now active.",
      &["Salmon Kibble 2kg".to_string(), "Dental Chews".to_string()],
    );
    assert!(body.contains("Your subscription is now active."));
    assert!(body.contains("<li>Salmon Kibble 2kg</li>"));
    assert!(body.contains("<li>Dental Chews</li>"));
  }
}
