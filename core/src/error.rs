// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("Payment gateway error: {message}")]
  Gateway { message: String },

  #[error("Order store error for order '{order_id}'. Source: {source}")]
  Store {
    order_id: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Order '{order_id}' was not found")]
  OrderNotFound { order_id: String },

  #[error("Timed out waiting for {operation}")]
  Timeout { operation: &'static str },

  #[error("Local storage error: {0}")]
  Storage(String),

  #[error("Failed to decode payload: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Error in collaborator or external operation. Source: {source}")]
  External {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for CheckoutError {
  fn from(err: AnyhowError) -> Self {
    CheckoutError::External { source: err }
  }
}

pub type CheckoutResult<T, E = CheckoutError> = std::result::Result<T, E>;
