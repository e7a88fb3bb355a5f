// app/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("Forbidden: admin access required")]
  Forbidden,

  #[error("Configuration Error: {0}")]
  Config(String),

  /// The provider answered with a non-2xx status.
  #[error("Provider Error ({status}): {message}")]
  Upstream { status: u16, message: String },

  /// The provider answered 2xx with a body we cannot use.
  #[error("Malformed Provider Response: {0}")]
  UpstreamShape(String),

  #[error("Provider Unreachable: {0}")]
  Transport(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      AppError::Transport(format!("request timed out: {}", err))
    } else {
      AppError::Transport(err.to_string())
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    // Provider calls wrapped in anyhow keep their transport classification.
    match err.downcast::<reqwest::Error>() {
      Ok(reqwest_err) => AppError::from(reqwest_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl AppError {
  /// Text safe to show to the client. Configuration and transport details stay in the logs.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) => m.clone(),
      AppError::Unauthorized => "Unauthorized".to_string(),
      AppError::Forbidden => "Forbidden: admin access required".to_string(),
      AppError::Config(_) => "Server configuration error".to_string(),
      AppError::Upstream { message, .. } => message.clone(),
      AppError::UpstreamShape(_) => "Unexpected response from provider".to_string(),
      AppError::Transport(_) => "Failed to reach provider".to_string(),
      AppError::Internal(_) => "An internal error occurred".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthorized => StatusCode::UNAUTHORIZED,
      AppError::Forbidden => StatusCode::FORBIDDEN,
      AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY),
      AppError::UpstreamShape(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Transport(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    match self {
      AppError::Validation(_) | AppError::Unauthorized | AppError::Forbidden => {
        tracing::warn!(application_error = %self, "Rejecting request");
      }
      _ => tracing::error!(application_error = %self, "Responding with error"),
    }
    HttpResponse::build(self.status_code()).json(json!({
      "success": false,
      "error": self.public_message(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
