// paygate/server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use paygate::PaygateError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  /// Outbound HTTP call failed. The message never includes the request URL.
  #[error("Upstream Error: {0}")]
  Upstream(String),

  #[error("Telegram API Error: {0}")]
  Telegram(String),

  #[error("Engine Error: {source}")]
  Engine {
    #[from]
    source: PaygateError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    // Request URLs carry the bot token; drop them before the error is displayed anywhere.
    AppError::Upstream(err.without_url().to_string())
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<PaygateError>() {
      Ok(engine) => AppError::Engine { source: engine },
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    match self {
      // Webhook rejections carry no diagnostic detail.
      AppError::Engine {
        source: PaygateError::Unauthorized(_),
      } => {
        tracing::warn!("Responding 401 to unauthenticated request.");
        HttpResponse::Unauthorized().json(json!({"error": "unauthorized"}))
      }
      AppError::Engine {
        source: PaygateError::MalformedPayload(m),
      } => {
        tracing::warn!(detail = %m, "Responding 400 to malformed payload.");
        HttpResponse::BadRequest().json(json!({"error": "malformed payload"}))
      }
      AppError::Engine {
        source: PaygateError::Validation(m),
      } => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Engine {
        source: PaygateError::OrderNotFound(_) | PaygateError::ProductNotFound(_),
      } => HttpResponse::NotFound().json(json!({"error": "not found"})),
      other => {
        tracing::error!(application_error = %other, "Responding with error");
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
